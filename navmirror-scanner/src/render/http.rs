//! Script-free renderer for server-rendered documentation sites.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

use super::{OpenOptions, Renderer};
use crate::error::{Result, ScanError};

/// Serves each page exactly as the server sends it. Scripts never run, so
/// `evaluate` and `click` are unsupported and navigation trees must already
/// be fully present in the markup.
pub struct HttpRenderer {
    client: Client,
    body: String,
}

impl HttpRenderer {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("navmirror/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            body: String::new(),
        })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open(&mut self, url: &str, options: OpenOptions) -> Result<()> {
        self.body.clear();
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ScanError::timeout(format!("loading {url}"), options.timeout)
                } else {
                    ScanError::navigation(url, e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::navigation(url, format!("HTTP {}", status)));
        }
        self.body = response.text().await?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        let selector = Selector::parse(selector)
            .map_err(|e| ScanError::Script(format!("invalid selector {selector}: {e}")))?;
        let document = Html::parse_document(&self.body);
        Ok(document.select(&selector).next().is_some())
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Err(ScanError::Unsupported("script evaluation"))
    }

    async fn content(&self) -> Result<String> {
        Ok(self.body.clone())
    }

    async fn click(&self, _selector: &str) -> Result<()> {
        Err(ScanError::Unsupported("click"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_open_reads_body_and_matches_selectors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><body><nav class=\"tree\">x</nav></body></html>"),
            )
            .mount(&mock_server)
            .await;

        let mut renderer = HttpRenderer::new().unwrap();
        renderer
            .open(&format!("{}/docs", mock_server.uri()), OpenOptions::default())
            .await
            .unwrap();

        assert!(renderer.content().await.unwrap().contains("class=\"tree\""));
        assert!(renderer.wait_for_selector("nav.tree", Duration::ZERO).await.unwrap());
        assert!(!renderer.wait_for_selector(".missing", Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn test_error_status_is_a_navigation_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let mut renderer = HttpRenderer::new().unwrap();
        let err = renderer
            .open(&format!("{}/docs/broken", mock_server.uri()), OpenOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Navigation { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_failed_open_drops_previous_document() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<nav>a</nav>"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/docs/b"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let mut renderer = HttpRenderer::new().unwrap();
        renderer
            .open(&format!("{}/docs/a", mock_server.uri()), OpenOptions::default())
            .await
            .unwrap();
        assert!(renderer
            .open(&format!("{}/docs/b", mock_server.uri()), OpenOptions::default())
            .await
            .is_err());

        assert_eq!(renderer.content().await.unwrap(), "");
        assert!(!renderer.wait_for_selector("nav", Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn test_scripts_are_unsupported() {
        let renderer = HttpRenderer::new().unwrap();
        assert!(matches!(
            renderer.evaluate("1 + 1").await,
            Err(ScanError::Unsupported(_))
        ));
        assert!(matches!(
            renderer.click("button").await,
            Err(ScanError::Unsupported(_))
        ));
    }
}
