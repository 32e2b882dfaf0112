use std::collections::HashSet;

use crate::canonical::pathname;
use crate::model::{FlatRecord, LinkRecord, NavNode};

/// Title of the synthetic node that groups several root URLs.
pub const MULTI_ROOT_TITLE: &str = "multi-root";

/// Rebuild the navigation forest from level-tagged rows.
///
/// Keeps a stack of open ancestors. A row closes every open node whose level
/// is `>=` its own; a closed node is attached to whatever is below it on the
/// stack, or becomes a top-level node when nothing is. Level jumps of any
/// size are accepted: a row is always a child of the nearest shallower row.
/// Folders that end up with no children are dropped.
pub fn build_tree(records: &[FlatRecord]) -> Vec<NavNode> {
    let mut roots: Vec<NavNode> = Vec::new();
    let mut stack: Vec<(NavNode, usize)> = Vec::new();

    for record in records {
        while stack.last().is_some_and(|(_, level)| *level >= record.level) {
            close_top(&mut stack, &mut roots);
        }
        stack.push((NavNode::new(record.title.clone(), record.url.clone()), record.level));
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    prune(roots)
}

fn close_top(stack: &mut Vec<(NavNode, usize)>, roots: &mut Vec<NavNode>) {
    if let Some((node, _)) = stack.pop() {
        match stack.last_mut() {
            Some((parent, _)) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Drop folder nodes that have nothing underneath them, bottom-up.
pub fn prune(nodes: Vec<NavNode>) -> Vec<NavNode> {
    nodes
        .into_iter()
        .filter_map(|mut node| {
            node.children = prune(std::mem::take(&mut node.children));
            if node.url.is_none() && node.children.is_empty() {
                None
            } else {
                Some(node)
            }
        })
        .collect()
}

/// Wrap the forest discovered under each root into the single stored tree.
///
/// One root yields a folder titled with that root URL. Several roots yield a
/// synthetic [`MULTI_ROOT_TITLE`] folder holding one such folder per root.
/// Roots that contributed no links leave no folder behind; the returned
/// top-level node is the container and is kept even when empty.
pub fn compose_roots(mut per_root: Vec<(String, Vec<NavNode>)>) -> NavNode {
    if per_root.len() == 1 {
        let (root_url, children) = per_root.remove(0);
        return NavNode::folder(root_url, prune(children));
    }
    let children = per_root
        .into_iter()
        .map(|(root_url, children)| NavNode::folder(root_url, children))
        .collect();
    NavNode::folder(MULTI_ROOT_TITLE, prune(children))
}

/// Pre-order list of every URL-bearing node, folders skipped.
pub fn flatten(node: &NavNode) -> Vec<LinkRecord> {
    let mut links = Vec::new();
    collect_links(node, &mut links);
    links
}

fn collect_links(node: &NavNode, out: &mut Vec<LinkRecord>) {
    if let Some(url) = &node.url {
        out.push(LinkRecord {
            url: url.clone(),
            title: node.title.clone(),
            pathname: pathname(url),
        });
    }
    for child in &node.children {
        collect_links(child, out);
    }
}

/// Pre-order rows of a forest, levels starting at zero. Inverse of
/// [`build_tree`] for any pruned forest.
pub fn flatten_records(nodes: &[NavNode]) -> Vec<FlatRecord> {
    let mut records = Vec::new();
    let mut pending: Vec<(&NavNode, usize)> = nodes.iter().rev().map(|n| (n, 0)).collect();
    while let Some((node, level)) = pending.pop() {
        records.push(FlatRecord {
            level,
            title: node.title.clone(),
            url: node.url.clone(),
        });
        pending.extend(node.children.iter().rev().map(|c| (c, level + 1)));
    }
    records
}

/// Demote repeated URLs to folder labels, keeping the first occurrence.
pub fn dedup_urls(records: &mut [FlatRecord]) {
    let mut seen = HashSet::new();
    for record in records.iter_mut() {
        if let Some(url) = &record.url
            && !seen.insert(url.clone())
        {
            record.url = None;
        }
    }
}
