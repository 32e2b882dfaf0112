//! Headless Chromium renderer using chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{OpenOptions, Renderer, WaitCondition};
use crate::error::{Result, ScanError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Locate a Chromium binary: explicit path, then `NAVMIRROR_CHROME`, then `PATH`.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    if let Ok(p) = std::env::var("NAVMIRROR_CHROME") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    ["google-chrome", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// One browser with one page, used strictly sequentially.
pub struct ChromiumRenderer {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    /// Budget for script, content and click calls; follows the last `open`.
    call_timeout: Duration,
}

/// Run one CDP call, failing with a timeout once `budget` is spent.
async fn bounded<T, F>(what: &str, budget: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(budget, call)
        .await
        .map_err(|_| ScanError::timeout(what, budget))?
}

impl ChromiumRenderer {
    pub async fn launch(chrome_path: Option<&Path>) -> Result<Self> {
        let chrome_path = find_chromium(chrome_path).ok_or_else(|| {
            ScanError::Browser(
                "Chromium not found. Pass --chrome or set NAVMIRROR_CHROME.".to_string(),
            )
        })?;
        debug!("Launching Chromium at {}", chrome_path.display());

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| ScanError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScanError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::Browser(format!("failed to open page: {e}")))?;

        Ok(Self {
            browser,
            page,
            handler,
            call_timeout: OpenOptions::default().timeout,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open(&mut self, url: &str, options: OpenOptions) -> Result<()> {
        self.call_timeout = options.timeout;
        let page = &self.page;
        let navigation = async {
            page.goto(url)
                .await
                .map_err(|e| ScanError::navigation(url, e))?;
            if options.wait == WaitCondition::NetworkIdle {
                page.wait_for_navigation()
                    .await
                    .map_err(|e| ScanError::navigation(url, e))?;
            }
            Ok::<(), ScanError>(())
        };

        tokio::time::timeout(options.timeout, navigation)
            .await
            .map_err(|_| ScanError::timeout(format!("loading {url}"), options.timeout))?
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining.max(POLL_INTERVAL), self.page.find_element(selector)).await {
                Ok(Ok(_)) => return Ok(true),
                Ok(Err(_)) => {}
                Err(_) => return Ok(false),
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = bounded("running script", self.call_timeout, async {
            self.page
                .evaluate(script)
                .await
                .map_err(|e| ScanError::Script(e.to_string()))
        })
        .await?;

        result
            .into_value()
            .map_err(|e| ScanError::Script(format!("failed to convert script result: {e:?}")))
    }

    async fn content(&self) -> Result<String> {
        bounded("reading page content", self.call_timeout, async {
            self.page
                .content()
                .await
                .map_err(|e| ScanError::Browser(format!("failed to read page content: {e}")))
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        bounded("clicking", self.call_timeout, async {
            let element = self
                .page
                .find_element(selector)
                .await
                .map_err(|e| ScanError::Browser(format!("{selector}: {e}")))?;
            element
                .click()
                .await
                .map_err(|e| ScanError::Browser(format!("click on {selector} failed: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let Self {
            mut browser,
            page,
            handler,
            ..
        } = *self;
        let _ = page.close().await;
        if let Err(e) = browser.close().await {
            warn!("Browser did not shut down cleanly: {}", e);
        }
        let _ = browser.wait().await;
        handler.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_call_times_out() {
        let result: Result<()> =
            bounded("running script", Duration::from_secs(5), std::future::pending()).await;
        assert!(matches!(
            result,
            Err(ScanError::Timeout { after, .. }) if after == Duration::from_secs(5)
        ));
    }

    #[tokio::test]
    async fn test_bounded_call_passes_result_through() {
        let result = bounded("reading page content", Duration::from_secs(5), async {
            Ok::<_, ScanError>("<html></html>".to_string())
        })
        .await;
        assert_eq!(result.unwrap(), "<html></html>");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_open_evaluate_and_read() {
        let mut renderer = ChromiumRenderer::launch(None)
            .await
            .expect("failed to launch Chromium");

        renderer
            .open(
                "data:text/html,<h1>Hello</h1><p>World</p>",
                OpenOptions {
                    wait: WaitCondition::Load,
                    timeout: Duration::from_secs(10),
                },
            )
            .await
            .expect("navigation failed");

        assert!(renderer.wait_for_selector("h1", Duration::from_secs(1)).await.unwrap());

        let heading = renderer
            .evaluate("document.querySelector('h1').textContent")
            .await
            .expect("script failed");
        assert_eq!(heading.as_str(), Some("Hello"));

        let html = renderer.content().await.expect("content failed");
        assert!(html.contains("<p>World</p>"));

        Box::new(renderer).close().await.expect("close failed");
    }
}
