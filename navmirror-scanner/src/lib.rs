pub mod canonical;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod model;
pub mod profile;
pub mod render;
pub mod tree;

pub use canonical::{Canonicalizer, storage_file, storage_href, storage_path};
pub use error::ScanError;
pub use extractor::NavExtractor;
pub use fetcher::{FetchOptions, FetchProgressCallback, PageFetcher, storage_collisions};
pub use model::{CrawlState, FailedPage, FlatRecord, LinkRecord, NavNode};
pub use profile::SiteProfile;
pub use render::{ChromiumRenderer, HttpRenderer, OpenOptions, Renderer, WaitCondition};
