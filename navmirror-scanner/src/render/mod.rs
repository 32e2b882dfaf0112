//! Page rendering capability.
//!
//! The extractor and fetcher only ever talk to a [`Renderer`], one command
//! at a time. [`chromium::ChromiumRenderer`] drives a headless browser;
//! [`http::HttpRenderer`] fetches server-rendered HTML for sites (and tests)
//! that need no script execution.

pub mod chromium;
pub mod http;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub use chromium::{ChromiumRenderer, find_chromium};
pub use http::HttpRenderer;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitCondition {
    /// The load event fired.
    Load,
    /// The load event fired and in-flight navigation settled.
    #[default]
    NetworkIdle,
}

#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    pub wait: WaitCondition,
    pub timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            wait: WaitCondition::NetworkIdle,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A single live page.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url` and wait until it is rendered.
    async fn open(&mut self, url: &str, options: OpenOptions) -> Result<()>;

    /// Whether `selector` matches something before `timeout` runs out.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Evaluate a script expression in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Fully rendered HTML of the current document.
    async fn content(&self) -> Result<String>;

    /// Click the first element matching `selector`. Used for one-control
    /// expansion when the click script cannot run.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Release the page and its browser.
    async fn close(self: Box<Self>) -> Result<()>;
}
