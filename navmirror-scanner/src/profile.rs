use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, ScanError};

/// Describes how a documentation site renders its navigation tree.
///
/// The defaults target Ant Design style trees, where every row is a
/// `.ant-tree-treenode` carrying one `.ant-tree-indent-unit` span per
/// nesting level and collapsed branches expose a `.ant-tree-switcher_close`
/// toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Candidate selectors for the tree container, tried in order.
    pub tree_selectors: Vec<String>,
    pub row_selector: String,
    pub indent_selector: String,
    pub title_selector: String,
    pub link_selector: String,
    pub collapsed_selector: String,
    /// Only same-origin links whose path starts with this prefix are kept.
    pub doc_path_prefix: String,
    pub container_attempts: u32,
    pub container_timeout_ms: u64,
    pub expand_max_rounds: u32,
    pub expand_settle_ms: u64,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            tree_selectors: vec![
                ".ant-tree".to_string(),
                "[role=tree]".to_string(),
                "nav".to_string(),
            ],
            row_selector: ".ant-tree-treenode".to_string(),
            indent_selector: ".ant-tree-indent-unit".to_string(),
            title_selector: ".ant-tree-title".to_string(),
            link_selector: "a[href]".to_string(),
            collapsed_selector: ".ant-tree-switcher_close".to_string(),
            doc_path_prefix: "/docs".to_string(),
            container_attempts: 5,
            container_timeout_ms: 2_000,
            expand_max_rounds: 50,
            expand_settle_ms: 300,
        }
    }
}

impl SiteProfile {
    /// Load a profile from a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            ScanError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid site profile {}: {}", path.display(), e),
            ))
        })
    }

    pub fn with_doc_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.doc_path_prefix = prefix.into();
        self
    }

    pub fn container_timeout(&self) -> Duration {
        Duration::from_millis(self.container_timeout_ms)
    }

    pub fn expand_settle(&self) -> Duration {
        Duration::from_millis(self.expand_settle_ms)
    }
}
