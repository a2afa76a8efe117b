//! Browser automation using chromiumoxide.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::time::{sleep, timeout};

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::scraper::{PageFetcher, WaitFor};

/// Headless Chrome wrapper. One instance serves the whole run; pages are
/// opened and closed per fetch.
pub struct Browser {
    browser: ChromeBrowser,
    handle: tokio::task::JoinHandle<()>,
    nav_timeout: Duration,
}

impl Browser {
    /// Launch a browser instance per the scraper configuration.
    pub async fn launch(config: &ScraperConfig) -> Result<Self> {
        let chrome_path = match &config.chrome_path {
            Some(path) => path.clone(),
            None => default_chrome_path().to_string(),
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .no_sandbox()
            .disable_default_args()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--mute-audio")
            .window_size(1920, 1080);
        if config.headless {
            builder = builder.arg("--headless=new");
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = ChromeBrowser::launch(browser_config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to launch browser: {}", e))?;

        // Spawn handler task - must keep running for browser to work
        let handle = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => continue, // Don't break on errors
                    None => break,
                }
            }
        });

        // Wait for browser to be ready
        sleep(Duration::from_secs(1)).await;

        Ok(Self {
            browser,
            handle,
            nav_timeout: Duration::from_secs(config.nav_timeout_secs),
        })
    }

    async fn fetch_page(&self, url: &str, wait: &WaitFor) -> Result<String, ScrapeError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| ScrapeError::navigation(url, format!("failed to open page: {e}")))?;

        match wait {
            WaitFor::Settle(delay) => sleep(*delay).await,
            WaitFor::Selector(selector) => Self::wait_for_selector(&page, selector).await,
        }

        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::navigation(url, format!("failed to read content: {e}")))?;

        let _ = page.close().await;

        Ok(html)
    }

    /// Poll until the selector matches. The caller's navigation timeout
    /// bounds this loop.
    async fn wait_for_selector(page: &Page, selector: &str) {
        while page.find_element(selector).await.is_err() {
            sleep(Duration::from_millis(250)).await;
        }
    }

    /// Close the browser
    pub async fn close(mut self) -> Result<()> {
        let _ = self.browser.close().await;
        self.handle.abort();
        Ok(())
    }
}

#[async_trait]
impl PageFetcher for Browser {
    async fn fetch(&self, url: &str, wait: WaitFor) -> Result<String, ScrapeError> {
        match timeout(self.nav_timeout, self.fetch_page(url, &wait)).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::navigation(
                url,
                format!("timed out after {:?}", self.nav_timeout),
            )),
        }
    }
}

fn default_chrome_path() -> &'static str {
    if cfg!(target_os = "macos") {
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
    } else if cfg!(target_os = "windows") {
        "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe"
    } else {
        "google-chrome"
    }
}
