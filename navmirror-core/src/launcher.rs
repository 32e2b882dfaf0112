use async_trait::async_trait;
use navmirror_scanner::error::Result;
use navmirror_scanner::render::{ChromiumRenderer, HttpRenderer, Renderer};
use std::path::PathBuf;

/// Produces the single page session a run uses. Called lazily, so stages
/// that never touch the network never start a browser.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Renderer>>;
}

/// Headless Chromium.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    pub chrome_path: Option<PathBuf>,
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn Renderer>> {
        let renderer = ChromiumRenderer::launch(self.chrome_path.as_deref()).await?;
        Ok(Box::new(renderer))
    }
}

/// Plain HTTP fetching, for sites that render their navigation server-side.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLauncher;

#[async_trait]
impl BrowserLauncher for StaticLauncher {
    async fn launch(&self) -> Result<Box<dyn Renderer>> {
        Ok(Box::new(HttpRenderer::new()?))
    }
}
