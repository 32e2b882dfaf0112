// Stage orchestration: extract -> checkpoint -> scrape -> index

use navmirror_scanner::canonical::Canonicalizer;
use navmirror_scanner::extractor::NavExtractor;
use navmirror_scanner::fetcher::{FetchOptions, FetchProgressCallback, PageFetcher};
use navmirror_scanner::model::CrawlState;
use navmirror_scanner::profile::SiteProfile;
use navmirror_scanner::render::{OpenOptions, Renderer};
use navmirror_scanner::tree::{build_tree, compose_roots};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::checkpoint::{Checkpoint, DEFAULT_CHECKPOINT, LinkStore};
use crate::error::{CoreError, Result};
use crate::index::write_index;
use crate::launcher::BrowserLauncher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Discover links and write the checkpoint.
    Extract,
    /// Fetch every checkpointed page, then rebuild the index.
    Scrape,
    /// Rebuild the index from the checkpoint only.
    Index,
    /// Extract then scrape in one browser session.
    #[default]
    All,
}

impl Stage {
    pub fn needs_start_urls(self) -> bool {
        matches!(self, Stage::Extract | Stage::All)
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "extract" => Ok(Stage::Extract),
            "scrape" => Ok(Stage::Scrape),
            "index" => Ok(Stage::Index),
            "all" => Ok(Stage::All),
            other => Err(CoreError::Configuration(format!(
                "unknown stage '{}', expected extract, scrape, index or all",
                other
            ))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Scrape => "scrape",
            Stage::Index => "index",
            Stage::All => "all",
        };
        f.write_str(name)
    }
}

/// Options for a single run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub stage: Stage,
    pub incremental: bool,
    pub dry_run: bool,
    pub output_dir: PathBuf,
    pub checkpoint_path: PathBuf,
    pub start_urls: Vec<String>,
    pub profile: SiteProfile,
    pub open: OpenOptions,
    pub pacing: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            stage: Stage::All,
            incremental: false,
            dry_run: false,
            output_dir: PathBuf::from("mirror"),
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT),
            start_urls: Vec::new(),
            profile: SiteProfile::default(),
            open: OpenOptions::default(),
            pacing: Duration::from_millis(500),
        }
    }
}

impl PipelineOptions {
    /// Reject configurations that cannot run, before any browser starts.
    pub fn validate(&self) -> Result<()> {
        if self.stage.needs_start_urls() {
            if self.start_urls.is_empty() {
                return Err(CoreError::Configuration(format!(
                    "the {} stage needs at least one start URL",
                    self.stage
                )));
            }
            for url in &self.start_urls {
                Canonicalizer::new(url, &self.profile.doc_path_prefix)
                    .map_err(|e| CoreError::Configuration(e.to_string()))?;
            }
        }
        if self.output_dir.is_file() {
            return Err(CoreError::Configuration(format!(
                "output directory {} is a file",
                self.output_dir.display()
            )));
        }
        Ok(())
    }
}

/// Outcome of a run, for the caller to report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stage: Stage,
    pub dry_run: bool,
    pub checkpoint: Option<Checkpoint>,
    pub crawl: Option<CrawlState>,
    pub index_path: Option<PathBuf>,
}

impl RunReport {
    fn new(stage: Stage, dry_run: bool) -> Self {
        Self {
            stage,
            dry_run,
            checkpoint: None,
            crawl: None,
            index_path: None,
        }
    }
}

pub struct Pipeline<L: BrowserLauncher> {
    options: PipelineOptions,
    launcher: L,
    progress_callback: Option<FetchProgressCallback>,
}

impl<L: BrowserLauncher> Pipeline<L> {
    pub fn new(options: PipelineOptions, launcher: L) -> Self {
        Self {
            options,
            launcher,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: FetchProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the selected stage. Page failures end up in the report; only
    /// configuration, checkpoint and browser start-up problems are errors.
    pub async fn run(&self) -> Result<RunReport> {
        self.options.validate()?;
        let store = LinkStore::new(&self.options.checkpoint_path);
        let mut session: Option<Box<dyn Renderer>> = None;

        let result = self.run_stage(&store, &mut session).await;

        if let Some(page) = session
            && let Err(e) = page.close().await
        {
            warn!("Closing the browser session failed: {}", e);
        }
        result
    }

    async fn run_stage(
        &self,
        store: &LinkStore,
        session: &mut Option<Box<dyn Renderer>>,
    ) -> Result<RunReport> {
        let stage = self.options.stage;
        let mut report = RunReport::new(stage, self.options.dry_run);
        info!("Running stage {}", stage);

        match stage {
            Stage::Extract => {
                report.checkpoint = Some(self.extract(store, session).await?);
            }
            Stage::Scrape => {
                let checkpoint = store.load()?;
                self.scrape(checkpoint, session, &mut report).await?;
            }
            Stage::Index => {
                let checkpoint = store.load()?;
                if !self.options.dry_run {
                    report.index_path = Some(write_index(&self.options.output_dir, &checkpoint.tree)?);
                }
                report.checkpoint = Some(checkpoint);
            }
            Stage::All => {
                let checkpoint = self.extract(store, session).await?;
                self.scrape(checkpoint, session, &mut report).await?;
            }
        }
        Ok(report)
    }

    async fn extract(
        &self,
        store: &LinkStore,
        session: &mut Option<Box<dyn Renderer>>,
    ) -> Result<Checkpoint> {
        let page = self.session(session).await?;
        let extractor = NavExtractor::new(self.options.profile.clone(), self.options.open);

        let mut per_root = Vec::with_capacity(self.options.start_urls.len());
        for root in &self.options.start_urls {
            let records = extractor.extract(&mut **page, root).await?;
            per_root.push((root.clone(), build_tree(&records)));
        }

        let tree = compose_roots(per_root);
        store.save(&self.options.start_urls, tree)
    }

    async fn scrape(
        &self,
        checkpoint: Checkpoint,
        session: &mut Option<Box<dyn Renderer>>,
        report: &mut RunReport,
    ) -> Result<()> {
        if self.options.dry_run {
            debug!("Dry run: not fetching {} links", checkpoint.total_count);
            report.checkpoint = Some(checkpoint);
            return Ok(());
        }

        let output_dir = &self.options.output_dir;
        if self.options.incremental {
            fs::create_dir_all(output_dir).map_err(|e| CoreError::persistence(output_dir, e))?;
        } else {
            empty_dir(output_dir, &self.options.checkpoint_path)?;
        }

        let page = self.session(session).await?;
        let mut fetcher = PageFetcher::new(
            output_dir,
            FetchOptions {
                incremental: self.options.incremental,
                pacing: self.options.pacing,
                open: self.options.open,
            },
        );
        if let Some(ref callback) = self.progress_callback {
            fetcher = fetcher.with_progress_callback(callback.clone());
        }

        let state = fetcher
            .fetch_all(&mut **page, &checkpoint.flat_links, CrawlState::new())
            .await;

        report.index_path = Some(write_index(output_dir, &checkpoint.tree)?);
        report.crawl = Some(state);
        report.checkpoint = Some(checkpoint);
        Ok(())
    }

    async fn session<'s>(
        &self,
        slot: &'s mut Option<Box<dyn Renderer>>,
    ) -> Result<&'s mut Box<dyn Renderer>> {
        if slot.is_none() {
            info!("Starting page session");
            *slot = Some(self.launcher.launch().await?);
        }
        slot.as_mut()
            .ok_or_else(|| CoreError::Configuration("page session unavailable".to_string()))
    }
}

/// Remove everything inside `dir` (creating it if needed), except whatever
/// holds `keep`.
fn empty_dir(dir: &Path, keep: &Path) -> Result<()> {
    if !dir.exists() {
        return fs::create_dir_all(dir).map_err(|e| CoreError::persistence(dir, e));
    }

    let keep = fs::canonicalize(keep).ok();
    let entries = fs::read_dir(dir).map_err(|e| CoreError::persistence(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::persistence(dir, e))?;
        let path = entry.path();
        if let (Some(keep), Ok(canonical)) = (&keep, fs::canonicalize(&path))
            && keep.starts_with(&canonical)
        {
            debug!("Keeping {} (holds the checkpoint)", path.display());
            continue;
        }

        let removed = if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| CoreError::persistence(&path, e))?;
    }
    Ok(())
}
