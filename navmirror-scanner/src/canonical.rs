use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{Result, ScanError};

const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '\\', '|', '?', '*', '/', '%'];
const PLACEHOLDER: char = '_';

/// Resolves raw hrefs against a root page and decides which of them are
/// documentation links worth mirroring.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    base: Url,
    doc_path_prefix: String,
}

impl Canonicalizer {
    pub fn new(base: &str, doc_path_prefix: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| ScanError::MalformedUrl(format!("{}: {}", base, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ScanError::MalformedUrl(format!(
                "{}: only http and https roots are supported",
                base
            )));
        }
        Ok(Self {
            base,
            doc_path_prefix: doc_path_prefix.to_string(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Canonical form of the root page itself, ignoring the path predicate.
    pub fn root(&self) -> String {
        normalize(self.base.clone())
    }

    /// Resolve `href` to its canonical URL, or `None` when the link is not a
    /// same-origin documentation page.
    pub fn canonicalize(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            return None;
        }

        let resolved = self.base.join(href).ok()?;
        if resolved.origin() != self.base.origin() {
            return None;
        }
        if !self.is_doc_path(resolved.path()) {
            return None;
        }

        Some(normalize(resolved))
    }

    fn is_doc_path(&self, path: &str) -> bool {
        let prefix = self.doc_path_prefix.trim();
        prefix.is_empty() || prefix == "/" || path.starts_with(prefix)
    }
}

/// Strip the fragment and any trailing slash (except on the site root).
fn normalize(mut url: Url) -> String {
    url.set_fragment(None);
    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
        if url.path().is_empty() {
            url.set_path("/");
        }
    }
    url.to_string()
}

/// Path component of a canonical URL, `/` when empty.
pub fn pathname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() { "/".to_string() } else { path }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Map a canonical URL to a relative, `/`-separated storage path ending in
/// `.html`. Segments are percent-decoded before sanitizing, so the file
/// carries the readable name. Accepts its own output as input and returns
/// it unchanged.
pub fn storage_path(url: &str) -> String {
    let (path, query) = match Url::parse(url) {
        Ok(parsed) => (parsed.path().to_string(), parsed.query().map(str::to_string)),
        Err(_) => (url.to_string(), None),
    };

    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| sanitize_segment(&decode(s)))
        .collect();

    let mut relative = if segments.is_empty() {
        "index".to_string()
    } else {
        segments.join("/")
    };

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        relative.push(PLACEHOLDER);
        relative.push_str(&sanitize_segment(&decode(&query)));
    }

    if !has_html_extension(&relative) {
        relative.push_str(".html");
    }
    relative
}

/// Absolute location of `url`'s mirrored file under `output_dir`.
pub fn storage_file(output_dir: &Path, url: &str) -> PathBuf {
    let mut file = output_dir.to_path_buf();
    for segment in storage_path(url).split('/') {
        file.push(segment);
    }
    file
}

/// Relative link to `url`'s mirrored file, percent-encoded so a browser
/// resolves it back to the name [`storage_path`] wrote.
pub fn storage_href(url: &str) -> String {
    storage_path(url)
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if ILLEGAL_FILENAME_CHARS.contains(&c) || c.is_control() {
                PLACEHOLDER
            } else {
                c
            }
        })
        .collect()
}

fn has_html_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}
