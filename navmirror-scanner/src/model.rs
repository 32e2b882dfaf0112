use serde::{Deserialize, Serialize};

/// One rendered navigation row, before the hierarchy is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub level: usize,
    pub title: String,
    pub url: Option<String>,
}

impl FlatRecord {
    pub fn link(level: usize, title: &str, url: &str) -> Self {
        Self {
            level,
            title: title.to_string(),
            url: Some(url.to_string()),
        }
    }

    pub fn folder(level: usize, title: &str) -> Self {
        Self {
            level,
            title: title.to_string(),
            url: None,
        }
    }
}

/// A node of the reconstructed navigation hierarchy.
///
/// Nodes with a URL are pages; nodes without one are folders that only
/// group their children. A page may also have children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn new(title: impl Into<String>, url: Option<String>) -> Self {
        Self {
            title: title.into(),
            url,
            children: Vec::new(),
        }
    }

    pub fn folder(title: impl Into<String>, children: Vec<NavNode>) -> Self {
        Self {
            title: title.into(),
            url: None,
            children,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.url.is_none()
    }

    /// Number of URL-bearing nodes in this subtree, self included.
    pub fn link_count(&self) -> usize {
        let own = usize::from(self.url.is_some());
        own + self.children.iter().map(NavNode::link_count).sum::<usize>()
    }
}

/// A fetchable target, flattened out of the tree in pre-order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub title: String,
    pub pathname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPage {
    pub url: String,
    pub title: String,
    pub error: String,
}

/// Bookkeeping for one fetch batch. Lives only for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    pub visited: std::collections::HashSet<String>,
    pub failed: Vec<FailedPage>,
    pub success_count: usize,
    pub skipped_count: usize,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
