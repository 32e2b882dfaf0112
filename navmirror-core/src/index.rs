// Browsable index page for a mirrored documentation tree

use chrono::Utc;
use navmirror_scanner::canonical::storage_href;
use navmirror_scanner::model::NavNode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CoreError, Result};

pub const INDEX_FILE: &str = "index.html";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{TITLE}}</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; padding: 0 1rem; }
  header p { color: #666; margin-top: 0; }
  #filter { width: 100%; padding: .5rem; font-size: 1rem; margin-bottom: 1rem; box-sizing: border-box; }
  ul { list-style: none; margin: 0; padding-left: 1.25rem; }
  #tree > ul { padding-left: 0; }
  li { margin: .15rem 0; }
  li.folder > .label { font-weight: 600; color: #333; cursor: default; }
  a.label { text-decoration: none; color: #0550ae; }
  a.label:hover { text-decoration: underline; }
</style>
</head>
<body>
<header>
<h1>{{TITLE}}</h1>
<p>{{COUNT}} pages, generated {{GENERATED}}</p>
</header>
<input id="filter" type="search" placeholder="Filter pages..." autofocus>
<nav id="tree">
{{ITEMS}}
</nav>
<script>
(function () {
  function filterNode(li, query) {
    var label = li.querySelector(':scope > .label');
    var own = query === '' || (label && label.textContent.toLowerCase().indexOf(query) !== -1);
    var childQuery = own ? '' : query;
    var anyChild = false;
    li.querySelectorAll(':scope > ul > li').forEach(function (child) {
      if (filterNode(child, childQuery)) { anyChild = true; }
    });
    var show = own || anyChild;
    li.style.display = show ? '' : 'none';
    return show;
  }
  document.getElementById('filter').addEventListener('input', function (event) {
    var query = event.target.value.trim().toLowerCase();
    document.querySelectorAll('#tree > ul > li').forEach(function (li) { filterNode(li, query); });
  });
})();
</script>
</body>
</html>
"#;

/// Render the whole tree as a self-contained HTML page. Links point at the
/// mirrored files relative to the directory holding the index.
pub fn render_index(tree: &NavNode) -> String {
    let top: Vec<&NavNode> = if tree.url.is_some() {
        vec![tree]
    } else {
        tree.children.iter().collect()
    };

    let mut items = String::new();
    render_list(&top, 0, &mut items);

    let title = if tree.title.is_empty() {
        "Documentation index".to_string()
    } else {
        format!("Documentation index: {}", tree.title)
    };

    TEMPLATE
        .replace("{{TITLE}}", &escape_html(&title))
        .replace("{{COUNT}}", &tree.link_count().to_string())
        .replace(
            "{{GENERATED}}",
            &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
        .replace("{{ITEMS}}", &items)
}

fn render_list(nodes: &[&NavNode], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{}<ul>\n", indent));
    for node in nodes {
        match &node.url {
            Some(url) => out.push_str(&format!(
                "{}<li class=\"page\"><a class=\"label\" href=\"{}\">{}</a>",
                indent,
                escape_html(&storage_href(url)),
                escape_html(&node.title)
            )),
            None => out.push_str(&format!(
                "{}<li class=\"folder\"><span class=\"label\">{}</span>",
                indent,
                escape_html(&node.title)
            )),
        }
        if !node.children.is_empty() {
            out.push('\n');
            let children: Vec<&NavNode> = node.children.iter().collect();
            render_list(&children, depth + 1, out);
            out.push_str(&indent);
        }
        out.push_str("</li>\n");
    }
    out.push_str(&format!("{}</ul>\n", indent));
}

/// Write (or overwrite) the index at the root of `output_dir`.
pub fn write_index(output_dir: &Path, tree: &NavNode) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|e| CoreError::persistence(output_dir, e))?;
    let path = output_dir.join(INDEX_FILE);
    fs::write(&path, render_index(tree)).map_err(|e| CoreError::persistence(&path, e))?;
    info!("Wrote index to {}", path.display());
    Ok(path)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
