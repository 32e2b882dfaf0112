// Checkpoint persistence between the extract, scrape and index stages

use chrono::{DateTime, Utc};
use navmirror_scanner::model::{LinkRecord, NavNode};
use navmirror_scanner::tree::flatten;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};

pub const DEFAULT_CHECKPOINT: &str = "links.json";

/// Everything the extract stage discovered, normalized to one shape no
/// matter which file layout it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub extracted_at: DateTime<Utc>,
    pub root_urls: Vec<String>,
    pub total_count: usize,
    pub tree: NavNode,
    pub flat_links: Vec<LinkRecord>,
}

impl Checkpoint {
    pub fn new(root_urls: Vec<String>, tree: NavNode) -> Self {
        let flat_links = flatten(&tree);
        Self {
            extracted_at: Utc::now(),
            root_urls,
            total_count: flat_links.len(),
            tree,
            flat_links,
        }
    }
}

/// On-disk layout. `tree` is absent in files written before the
/// navigation hierarchy was recorded.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointFile {
    #[serde(default)]
    extracted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    start_url: StartUrl,
    #[serde(default)]
    total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tree: Option<NavNode>,
    #[serde(default)]
    links: Vec<LinkRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StartUrl {
    One(String),
    Many(Vec<String>),
}

impl Default for StartUrl {
    fn default() -> Self {
        StartUrl::Many(Vec::new())
    }
}

impl StartUrl {
    fn from_roots(roots: &[String]) -> Self {
        match roots {
            [single] => StartUrl::One(single.clone()),
            _ => StartUrl::Many(roots.to_vec()),
        }
    }

    fn into_roots(self) -> Vec<String> {
        match self {
            StartUrl::One(url) => url
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            StartUrl::Many(urls) => urls,
        }
    }
}

/// The two shapes a stored checkpoint can take.
enum StoredForm {
    Tree(NavNode),
    Flat(Vec<LinkRecord>),
}

impl CheckpointFile {
    fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        Self {
            extracted_at: Some(checkpoint.extracted_at),
            start_url: StartUrl::from_roots(&checkpoint.root_urls),
            total: checkpoint.total_count,
            tree: Some(checkpoint.tree.clone()),
            links: checkpoint.flat_links.clone(),
        }
    }

    fn into_checkpoint(self) -> Checkpoint {
        let stored_total = self.total;
        let root_urls = self.start_url.into_roots();
        let form = match self.tree {
            Some(tree) => StoredForm::Tree(tree),
            None => StoredForm::Flat(self.links),
        };

        let (tree, flat_links) = match form {
            StoredForm::Tree(tree) => {
                let links = flatten(&tree);
                (tree, links)
            }
            StoredForm::Flat(links) => {
                debug!("Checkpoint has no tree, using its flat link list");
                let children = links
                    .iter()
                    .map(|l| NavNode::new(l.title.clone(), Some(l.url.clone())))
                    .collect();
                let title = root_urls.first().cloned().unwrap_or_default();
                (NavNode::folder(title, children), links)
            }
        };

        if stored_total != flat_links.len() {
            warn!(
                "Checkpoint total {} disagrees with {} stored links, using the latter",
                stored_total,
                flat_links.len()
            );
        }

        Checkpoint {
            extracted_at: self.extracted_at.unwrap_or_default(),
            root_urls,
            total_count: flat_links.len(),
            tree,
            flat_links,
        }
    }
}

/// Reads and writes the checkpoint file.
#[derive(Debug, Clone)]
pub struct LinkStore {
    path: PathBuf,
}

impl LinkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Flatten `tree` and persist it. The file is replaced atomically: it is
    /// either the previous checkpoint or the complete new one.
    pub fn save(&self, root_urls: &[String], tree: NavNode) -> Result<Checkpoint> {
        let checkpoint = Checkpoint::new(root_urls.to_vec(), tree);
        self.write(&checkpoint)?;
        info!(
            "Saved checkpoint with {} links to {}",
            checkpoint.total_count,
            self.path.display()
        );
        Ok(checkpoint)
    }

    pub fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_string_pretty(&CheckpointFile::from_checkpoint(checkpoint))
            .map_err(|source| CoreError::CheckpointFormat {
                path: self.path.clone(),
                source,
            })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CoreError::persistence(parent, e))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|e| CoreError::persistence(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CoreError::persistence(&self.path, e)
        })
    }

    pub fn load(&self) -> Result<Checkpoint> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::CheckpointMissing {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(CoreError::persistence(&self.path, e)),
        };

        let file: CheckpointFile =
            serde_json::from_str(&raw).map_err(|source| CoreError::CheckpointFormat {
                path: self.path.clone(),
                source,
            })?;
        let checkpoint = file.into_checkpoint();
        debug!(
            "Loaded checkpoint from {} ({} links)",
            self.path.display(),
            checkpoint.total_count
        );
        Ok(checkpoint)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}
