// Human-readable listings and run summaries

use colored::Colorize;
use navmirror_scanner::canonical::{storage_file, storage_path};
use navmirror_scanner::model::{CrawlState, LinkRecord, NavNode};
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Every discovered page, indented by its depth in the tree, with the file
/// it will be saved to.
pub fn format_link_listing(tree: &NavNode) -> String {
    let mut listing = String::new();
    listing.push_str(&format!("{}\n\n", RULE));
    listing.push_str(&format!("# Discovered {} links\n\n", tree.link_count()));
    if tree.url.is_some() {
        push_node(tree, 0, &mut listing);
    } else {
        push_nodes(&tree.children, 0, &mut listing);
    }
    listing
}

fn push_nodes(nodes: &[NavNode], depth: usize, out: &mut String) {
    for node in nodes {
        push_node(node, depth, out);
    }
}

fn push_node(node: &NavNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth + 1);
    match &node.url {
        Some(url) => out.push_str(&format!(
            "{}{} {} {}\n",
            indent,
            node.title.bright_white(),
            url.dimmed(),
            format!("-> {}", storage_path(url)).cyan()
        )),
        None => out.push_str(&format!("{}{}\n", indent, format!("[{}]", node.title).bold())),
    }
    push_nodes(&node.children, depth + 1, out);
}

/// What a scrape would do, without doing it.
pub fn format_fetch_plan(links: &[LinkRecord], output_dir: &Path, incremental: bool) -> String {
    let mut plan = String::new();
    let mut skipped = 0;
    plan.push_str(&format!("{}\n\n", RULE));
    plan.push_str(&format!("# Dry run: {} links\n\n", links.len()));
    for link in links {
        let target = storage_file(output_dir, &link.url);
        if incremental && target.exists() {
            skipped += 1;
            plan.push_str(&format!("  {} {}\n", "skip ".yellow(), link.url));
        } else {
            plan.push_str(&format!(
                "  {} {} {}\n",
                "fetch".green(),
                link.url,
                format!("-> {}", target.display()).dimmed()
            ));
        }
    }
    plan.push_str(&format!(
        "\n  Would fetch: {}\n  Would skip: {}\n",
        links.len() - skipped,
        skipped
    ));
    plan
}

/// Success, failure and skip tallies followed by every failed page.
pub fn format_crawl_summary(state: &CrawlState, index_path: Option<&Path>) -> String {
    let mut report = String::new();
    report.push_str(&format!("{}\n\n", RULE));
    report.push_str("# Summary:\n");
    report.push_str(&format!(
        "  Saved: {}\n",
        state.success_count.to_string().green()
    ));
    report.push_str(&format!(
        "  Failed: {}\n",
        if state.failed.is_empty() {
            "0".normal()
        } else {
            state.failed.len().to_string().red()
        }
    ));
    report.push_str(&format!(
        "  Skipped: {}\n",
        state.skipped_count.to_string().yellow()
    ));

    if !state.failed.is_empty() {
        report.push_str("\n## Failed pages\n");
        for failure in &state.failed {
            report.push_str(&format!("  {} {}\n", "✗".red(), failure.url));
            report.push_str(&format!("    {}\n", failure.error.dimmed()));
        }
    }

    if let Some(path) = index_path {
        report.push_str(&format!("\n  Index: {}\n", path.display()));
    }
    report
}
