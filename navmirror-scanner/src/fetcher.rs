use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::canonical::{storage_file, storage_path};
use crate::error::Result;
use crate::model::{CrawlState, FailedPage, LinkRecord};
use crate::render::{OpenOptions, Renderer};

/// Called before each link is handled with `(index, total, url)`.
pub type FetchProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// Skip links whose mirrored file already exists.
    pub incremental: bool,
    /// Delay between two consecutive page loads.
    pub pacing: Duration,
    pub open: OpenOptions,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            incremental: false,
            pacing: Duration::from_millis(500),
            open: OpenOptions::default(),
        }
    }
}

/// Saves the rendered HTML of each link under the output directory.
pub struct PageFetcher {
    output_dir: PathBuf,
    options: FetchOptions,
    progress_callback: Option<FetchProgressCallback>,
}

impl PageFetcher {
    pub fn new(output_dir: impl Into<PathBuf>, options: FetchOptions) -> Self {
        Self {
            output_dir: output_dir.into(),
            options,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: FetchProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Fetch every link in order, accumulating into `state`.
    ///
    /// Never stops early: a failing page is recorded in `state.failed` and
    /// the batch moves on. Links already in `state.visited` are ignored.
    pub async fn fetch_all(
        &self,
        page: &mut dyn Renderer,
        links: &[LinkRecord],
        mut state: CrawlState,
    ) -> CrawlState {
        info!("Fetching {} pages into {}", links.len(), self.output_dir.display());
        for (kept, overwriting) in storage_collisions(links) {
            warn!("{} and {} are saved to the same file; the latter wins", kept, overwriting);
        }
        let mut fetched_any = false;

        for (idx, link) in links.iter().enumerate() {
            if let Some(ref callback) = self.progress_callback {
                callback(idx, links.len(), &link.url);
            }

            if !state.visited.insert(link.url.clone()) {
                debug!("Already handled {} in this run", link.url);
                continue;
            }

            let target = storage_file(&self.output_dir, &link.url);
            if self.options.incremental && tokio::fs::try_exists(&target).await.unwrap_or(false) {
                debug!("Skipping {} ({} exists)", link.url, target.display());
                state.skipped_count += 1;
                continue;
            }

            if fetched_any && !self.options.pacing.is_zero() {
                tokio::time::sleep(self.options.pacing).await;
            }
            fetched_any = true;

            match self.fetch_one(page, &link.url, &target).await {
                Ok(bytes) => {
                    debug!("Saved {} ({} bytes) to {}", link.url, bytes, target.display());
                    state.success_count += 1;
                }
                Err(e) => {
                    warn!("Fetch failed for {}: {}", link.url, e);
                    state.failed.push(FailedPage {
                        url: link.url.clone(),
                        title: link.title.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Fetch complete: {} saved, {} failed, {} skipped",
            state.success_count,
            state.failed.len(),
            state.skipped_count
        );
        state
    }

    async fn fetch_one(&self, page: &mut dyn Renderer, url: &str, target: &Path) -> Result<usize> {
        page.open(url, self.options.open).await?;
        let html = page.content().await?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, html.as_bytes()).await?;
        Ok(html.len())
    }
}

/// Pairs of distinct URLs that map to the same storage path, first
/// claimant first. `/docs/a` and `/docs/a.html` are one such pair.
pub fn storage_collisions(links: &[LinkRecord]) -> Vec<(&str, &str)> {
    let mut claimed: HashMap<String, &str> = HashMap::new();
    let mut collisions = Vec::new();
    for link in links {
        let path = storage_path(&link.url);
        match claimed.get(&path).copied() {
            Some(first) if first != link.url => collisions.push((first, link.url.as_str())),
            Some(_) => {}
            None => {
                claimed.insert(path, &link.url);
            }
        }
    }
    collisions
}
