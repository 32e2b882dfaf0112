use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::canonical::{Canonicalizer, pathname};
use crate::error::{Result, ScanError};
use crate::model::FlatRecord;
use crate::profile::SiteProfile;
use crate::render::{OpenOptions, Renderer};
use crate::tree::dedup_urls;

/// Renders a root page, expands its whole navigation tree and reads the
/// rows back as level-tagged records.
pub struct NavExtractor {
    profile: SiteProfile,
    open_options: OpenOptions,
}

impl NavExtractor {
    pub fn new(profile: SiteProfile, open_options: OpenOptions) -> Self {
        Self {
            profile,
            open_options,
        }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Extract the navigation rows reachable from `root_url`.
    ///
    /// A load timeout, a missing tree container and failed expansion clicks
    /// all degrade to scanning whatever the document holds. A root that
    /// fails to load outright yields no records. Only an unusable root URL
    /// or an unreadable page is an error.
    pub async fn extract(&self, page: &mut dyn Renderer, root_url: &str) -> Result<Vec<FlatRecord>> {
        let canonicalizer = Canonicalizer::new(root_url, &self.profile.doc_path_prefix)?;
        info!("Extracting navigation tree from {}", root_url);

        match page.open(root_url, self.open_options).await {
            Ok(()) => {}
            Err(e @ ScanError::Timeout { .. }) => {
                warn!("Loading {} timed out, scanning partial document: {}", root_url, e);
            }
            Err(e) => {
                // The page may still show whatever was loaded before.
                warn!("Loading {} failed, no links taken from it: {}", root_url, e);
                return Ok(Vec::new());
            }
        }

        let container = self.find_container(&*page).await;
        let clicked = self.expand_all(&*page).await;
        debug!("Expanded {} navigation nodes under {}", clicked, root_url);

        let html = page.content().await?;
        let mut records = parse_flat_records(&html, container.as_deref(), &self.profile, &canonicalizer);
        dedup_urls(&mut records);

        info!(
            "Found {} navigation rows ({} links) under {}",
            records.len(),
            records.iter().filter(|r| r.url.is_some()).count(),
            root_url
        );
        Ok(records)
    }

    /// Poll the fallback selectors until one matches or the attempts run out.
    async fn find_container(&self, page: &dyn Renderer) -> Option<String> {
        let selectors = &self.profile.tree_selectors;
        if selectors.is_empty() {
            return None;
        }
        let per_selector = self.profile.container_timeout() / selectors.len() as u32;

        for attempt in 1..=self.profile.container_attempts.max(1) {
            for selector in selectors {
                match page.wait_for_selector(selector, per_selector).await {
                    Ok(true) => {
                        debug!("Navigation container matched {} (attempt {})", selector, attempt);
                        return Some(selector.clone());
                    }
                    Ok(false) => {}
                    Err(e) => debug!("Selector {} not usable: {}", selector, e),
                }
            }
        }

        warn!("No navigation container found, scanning the whole document");
        None
    }

    /// Click every collapsed toggle, round after round, until a round finds
    /// nothing left to open. A round whose script fails falls back to
    /// clicking a single toggle. Returns the total number of clicks.
    async fn expand_all(&self, page: &dyn Renderer) -> u64 {
        let script = expand_script(&self.profile.collapsed_selector);
        let mut total = 0;

        for round in 1..=self.profile.expand_max_rounds {
            let clicked = match page.evaluate(&script).await {
                Ok(value) => value
                    .as_u64()
                    .or_else(|| value.as_f64().map(|n| n as u64))
                    .unwrap_or(0),
                Err(ScanError::Unsupported(what)) => {
                    debug!("Expansion unavailable: {} not supported", what);
                    return total;
                }
                Err(e) => {
                    // Script rounds failing: open one control at a time instead.
                    debug!("Expansion round {} script failed, clicking directly: {}", round, e);
                    match page.click(&self.profile.collapsed_selector).await {
                        Ok(()) => 1,
                        Err(_) => 0,
                    }
                }
            };
            if clicked == 0 {
                return total;
            }
            debug!("Expansion round {} opened {} nodes", round, clicked);
            total += clicked;
            tokio::time::sleep(self.profile.expand_settle()).await;
        }

        if total > 0 {
            warn!(
                "Navigation tree still had collapsed nodes after {} rounds",
                self.profile.expand_max_rounds
            );
        }
        total
    }
}

/// Script that clicks every element matching `collapsed_selector` and
/// returns how many clicks went through. Individual click failures are
/// swallowed.
pub fn expand_script(collapsed_selector: &str) -> String {
    let selector = serde_json::Value::String(collapsed_selector.to_string());
    format!(
        "(() => {{ let clicked = 0; document.querySelectorAll({selector}).forEach((el) => {{ \
         try {{ el.click(); clicked += 1; }} catch (e) {{}} }}); return clicked; }})()"
    )
}

/// Read navigation rows out of rendered HTML, in document order.
///
/// A row's level is the number of indent markers inside it. Rows whose link
/// is missing or rejected by `canonicalizer` become folder labels; rows with
/// neither title nor link are skipped.
pub fn parse_flat_records(
    html: &str,
    container_selector: Option<&str>,
    profile: &SiteProfile,
    canonicalizer: &Canonicalizer,
) -> Vec<FlatRecord> {
    let (Some(row), Some(indent), Some(title), Some(link)) = (
        selector(&profile.row_selector),
        selector(&profile.indent_selector),
        selector(&profile.title_selector),
        selector(&profile.link_selector),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let scope = container_selector
        .and_then(selector)
        .and_then(|container| document.select(&container).next())
        .unwrap_or_else(|| document.root_element());

    scope
        .select(&row)
        .filter_map(|node| {
            let level = node.select(&indent).count();
            let anchor = node.select(&link).next();
            let url = anchor
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| canonicalizer.canonicalize(href));

            let text = node
                .select(&title)
                .next()
                .or(anchor)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .or_else(|| Some(element_text(node)).filter(|t| !t.is_empty()));

            match (text, url) {
                (Some(title), url) => Some(FlatRecord { level, title, url }),
                (None, Some(url)) => Some(FlatRecord {
                    level,
                    title: pathname(&url),
                    url: Some(url),
                }),
                (None, None) => None,
            }
        })
        .collect()
}

fn selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Ignoring invalid selector {:?}: {}", raw, e);
            None
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}
