// End-to-end stage tests against a mock documentation site

use async_trait::async_trait;
use navmirror_core::checkpoint::LinkStore;
use navmirror_core::error::CoreError;
use navmirror_core::launcher::{BrowserLauncher, StaticLauncher};
use navmirror_core::pipeline::{Pipeline, PipelineOptions, Stage};
use navmirror_scanner::canonical::storage_file;
use navmirror_scanner::error::{Result as ScanResult, ScanError};
use navmirror_scanner::model::NavNode;
use navmirror_scanner::profile::SiteProfile;
use navmirror_scanner::render::Renderer;
use navmirror_scanner::tree::MULTI_ROOT_TITLE;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Fails the run if any stage tries to start a browser.
struct NoBrowser;

#[async_trait]
impl BrowserLauncher for NoBrowser {
    async fn launch(&self) -> ScanResult<Box<dyn Renderer>> {
        Err(ScanError::Browser("no browser in this test".to_string()))
    }
}

fn row(level: usize, inner: &str) -> String {
    let units = "<span class=\"ant-tree-indent-unit\"></span>".repeat(level);
    format!("<div class=\"ant-tree-treenode\"><span class=\"ant-tree-indent\">{units}</span>{inner}</div>")
}

fn nav_page(rows: &[String]) -> String {
    format!(
        "<html><body><main>root</main><div class=\"ant-tree\">{}</div></body></html>",
        rows.concat()
    )
}

async fn mount_html(server: &MockServer, route: &str, status: u16, body: &str, expected: Option<u64>) {
    let mock = Mock::given(method("GET")).and(path(route)).respond_with(
        ResponseTemplate::new(status)
            .insert_header("content-type", "text/html")
            .set_body_string(body.to_string()),
    );
    let mock = match expected {
        Some(n) => mock.expect(n),
        None => mock,
    };
    mock.mount(server).await;
}

/// A root page with a folder, two nested pages (one broken) and a top-level FAQ.
async fn docs_site(page_hits: Option<u64>) -> MockServer {
    let server = MockServer::start().await;
    let root = nav_page(&[
        row(0, "<span class=\"ant-tree-title\">Guides</span>"),
        row(1, "<a href=\"/docs/install\"><span class=\"ant-tree-title\">Install</span></a>"),
        row(1, "<a href=\"/docs/broken#top\"><span class=\"ant-tree-title\">Broken</span></a>"),
        row(0, "<a href=\"/docs/faq\"><span class=\"ant-tree-title\">FAQ</span></a>"),
        row(0, "<a href=\"https://elsewhere.dev/docs\"><span class=\"ant-tree-title\">Elsewhere</span></a>"),
    ]);
    mount_html(&server, "/docs", 200, &root, None).await;
    mount_html(&server, "/docs/install", 200, "<html>install</html>", page_hits).await;
    mount_html(&server, "/docs/broken", 500, "boom", page_hits).await;
    mount_html(&server, "/docs/faq", 200, "<html>faq</html>", page_hits).await;
    server
}

fn fast_profile() -> SiteProfile {
    SiteProfile {
        container_attempts: 1,
        container_timeout_ms: 10,
        expand_settle_ms: 0,
        ..SiteProfile::default()
    }
}

fn options(stage: Stage, work: &Path, start_urls: Vec<String>) -> PipelineOptions {
    PipelineOptions {
        stage,
        output_dir: work.join("out"),
        checkpoint_path: work.join("links.json"),
        start_urls,
        profile: fast_profile(),
        pacing: Duration::ZERO,
        ..PipelineOptions::default()
    }
}

// ============================================================================
// Full Run Tests
// ============================================================================

#[tokio::test]
async fn test_all_stage_mirrors_site() {
    let server = docs_site(Some(1)).await;
    let work = TempDir::new().unwrap();
    let root = format!("{}/docs", server.uri());

    let report = Pipeline::new(options(Stage::All, work.path(), vec![root.clone()]), StaticLauncher)
        .run()
        .await
        .unwrap();

    let checkpoint = report.checkpoint.unwrap();
    assert_eq!(checkpoint.total_count, 3);
    assert_eq!(checkpoint.tree.title, root);
    assert_eq!(checkpoint.tree.children[0].title, "Guides");

    let crawl = report.crawl.unwrap();
    assert_eq!(crawl.success_count, 2);
    assert_eq!(crawl.skipped_count, 0);
    assert_eq!(crawl.failed.len(), 1);
    assert_eq!(crawl.failed[0].url, format!("{}/docs/broken", server.uri()));
    assert!(crawl.failed[0].error.contains("500"));

    let out = work.path().join("out");
    assert_eq!(
        std::fs::read_to_string(out.join("docs/install.html")).unwrap(),
        "<html>install</html>"
    );
    assert!(out.join("docs/faq.html").exists());
    assert!(!out.join("docs/broken.html").exists());

    let index = std::fs::read_to_string(report.index_path.unwrap()).unwrap();
    assert!(index.contains(r#"href="docs/install.html""#));

    // The checkpoint survives for later stages.
    assert_eq!(LinkStore::new(work.path().join("links.json")).load().unwrap(), checkpoint);
}

#[tokio::test]
async fn test_full_scrape_clears_stale_output() {
    let server = docs_site(None).await;
    let work = TempDir::new().unwrap();
    let stale = work.path().join("out/old/page.html");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "stale").unwrap();

    Pipeline::new(
        options(Stage::All, work.path(), vec![format!("{}/docs", server.uri())]),
        StaticLauncher,
    )
    .run()
    .await
    .unwrap();

    assert!(!stale.exists());
    assert!(work.path().join("out/docs/faq.html").exists());
}

#[tokio::test]
async fn test_multiple_roots_share_one_tree() {
    let server = MockServer::start().await;
    let a = nav_page(&[
        row(0, "<a href=\"/docs/a/one\"><span class=\"ant-tree-title\">One</span></a>"),
        row(0, "<a href=\"/docs/shared\"><span class=\"ant-tree-title\">Shared</span></a>"),
    ]);
    let b = nav_page(&[row(0, "<a href=\"/docs/shared\"><span class=\"ant-tree-title\">Shared</span></a>")]);
    mount_html(&server, "/docs/a", 200, &a, None).await;
    mount_html(&server, "/docs/b", 200, &b, None).await;
    mount_html(&server, "/docs/a/one", 200, "one", Some(1)).await;
    mount_html(&server, "/docs/shared", 200, "shared", Some(1)).await;

    let work = TempDir::new().unwrap();
    let roots = vec![format!("{}/docs/a", server.uri()), format!("{}/docs/b", server.uri())];
    let report = Pipeline::new(options(Stage::All, work.path(), roots.clone()), StaticLauncher)
        .run()
        .await
        .unwrap();

    let checkpoint = report.checkpoint.unwrap();
    assert_eq!(checkpoint.tree.title, MULTI_ROOT_TITLE);
    assert_eq!(checkpoint.tree.children.len(), 2);
    assert_eq!(checkpoint.root_urls, roots);
    // The shared page appears under both roots but is fetched once.
    assert_eq!(checkpoint.total_count, 3);
    assert_eq!(report.crawl.unwrap().success_count, 2);
}

#[tokio::test]
async fn test_unreachable_root_contributes_nothing() {
    let server = MockServer::start().await;
    let a = nav_page(&[row(0, "<a href=\"/docs/a/install\"><span class=\"ant-tree-title\">Install</span></a>")]);
    mount_html(&server, "/docs/a", 200, &a, None).await;
    mount_html(&server, "/docs/b", 500, "down", None).await;

    let work = TempDir::new().unwrap();
    let roots = vec![format!("{}/docs/a", server.uri()), format!("{}/docs/b", server.uri())];
    let report = Pipeline::new(options(Stage::Extract, work.path(), roots.clone()), StaticLauncher)
        .run()
        .await
        .unwrap();

    let checkpoint = report.checkpoint.unwrap();
    assert_eq!(checkpoint.total_count, 1);
    assert_eq!(checkpoint.tree.title, MULTI_ROOT_TITLE);
    assert_eq!(checkpoint.tree.children.len(), 1);
    assert_eq!(checkpoint.tree.children[0].title, roots[0]);
    assert_eq!(checkpoint.root_urls, roots);
}

#[tokio::test]
async fn test_root_without_navigation_stores_empty_tree() {
    let server = MockServer::start().await;
    mount_html(&server, "/docs", 200, "<html><body>no tree</body></html>", None).await;

    let work = TempDir::new().unwrap();
    let report = Pipeline::new(
        options(Stage::Extract, work.path(), vec![format!("{}/docs", server.uri())]),
        StaticLauncher,
    )
    .run()
    .await
    .unwrap();

    let checkpoint = report.checkpoint.unwrap();
    assert_eq!(checkpoint.total_count, 0);
    assert!(checkpoint.tree.children.is_empty());
}

// ============================================================================
// Stage Isolation Tests
// ============================================================================

#[tokio::test]
async fn test_scrape_without_checkpoint_fails_fast() {
    let work = TempDir::new().unwrap();

    let err = Pipeline::new(options(Stage::Scrape, work.path(), vec![]), NoBrowser)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::CheckpointMissing { .. }));
    assert!(!work.path().join("out").exists());
}

#[tokio::test]
async fn test_scrape_without_checkpoint_leaves_output_alone() {
    let work = TempDir::new().unwrap();
    let kept = work.path().join("out/keep.html");
    std::fs::create_dir_all(kept.parent().unwrap()).unwrap();
    std::fs::write(&kept, "keep").unwrap();

    let result = Pipeline::new(options(Stage::Scrape, work.path(), vec![]), NoBrowser)
        .run()
        .await;

    assert!(result.is_err());
    assert!(kept.exists());
}

#[tokio::test]
async fn test_index_stage_needs_no_browser() {
    let work = TempDir::new().unwrap();
    let tree = NavNode::folder(
        "https://example.com/docs",
        vec![NavNode::new("A", Some("https://example.com/docs/a".to_string()))],
    );
    LinkStore::new(work.path().join("links.json"))
        .save(&["https://example.com/docs".to_string()], tree)
        .unwrap();

    let report = Pipeline::new(options(Stage::Index, work.path(), vec![]), NoBrowser)
        .run()
        .await
        .unwrap();

    let index = std::fs::read_to_string(report.index_path.unwrap()).unwrap();
    assert!(index.contains(r#"href="docs/a.html""#));
}

#[tokio::test]
async fn test_extract_requires_start_url() {
    let work = TempDir::new().unwrap();
    let err = Pipeline::new(options(Stage::Extract, work.path(), vec![]), NoBrowser)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Configuration(_)));
}

#[tokio::test]
async fn test_browser_start_failure_is_fatal() {
    let work = TempDir::new().unwrap();
    let err = Pipeline::new(
        options(Stage::Extract, work.path(), vec!["https://example.com/docs".to_string()]),
        NoBrowser,
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, CoreError::Scan(ScanError::Browser(_))));
    assert!(!work.path().join("links.json").exists());
}

// ============================================================================
// Incremental and Dry-Run Tests
// ============================================================================

#[tokio::test]
async fn test_incremental_scrape_skips_saved_pages() {
    let server = MockServer::start().await;
    let u1 = format!("{}/docs/one", server.uri());
    let u2 = format!("{}/docs/two", server.uri());
    mount_html(&server, "/docs/one", 200, "one", Some(0)).await;
    mount_html(&server, "/docs/two", 200, "two", Some(1)).await;

    let work = TempDir::new().unwrap();
    let tree = NavNode::folder(
        server.uri(),
        vec![
            NavNode::new("One", Some(u1.clone())),
            NavNode::new("Two", Some(u2.clone())),
        ],
    );
    LinkStore::new(work.path().join("links.json"))
        .save(&[server.uri()], tree)
        .unwrap();

    let existing = storage_file(&work.path().join("out"), &u1);
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, "cached").unwrap();

    let mut opts = options(Stage::Scrape, work.path(), vec![]);
    opts.incremental = true;
    let report = Pipeline::new(opts, StaticLauncher).run().await.unwrap();

    let crawl = report.crawl.unwrap();
    assert_eq!(crawl.skipped_count, 1);
    assert_eq!(crawl.success_count, 1);
    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "cached");
    assert!(report.index_path.is_some());
}

#[tokio::test]
async fn test_dry_run_writes_only_the_checkpoint() {
    let server = docs_site(Some(0)).await;
    let work = TempDir::new().unwrap();

    let mut opts = options(Stage::All, work.path(), vec![format!("{}/docs", server.uri())]);
    opts.dry_run = true;
    let report = Pipeline::new(opts, StaticLauncher).run().await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.checkpoint.unwrap().total_count, 3);
    assert!(report.crawl.is_none());
    assert!(report.index_path.is_none());
    assert!(work.path().join("links.json").exists());
    assert!(!work.path().join("out").exists());
}

#[tokio::test]
async fn test_dry_run_scrape_needs_no_browser() {
    let work = TempDir::new().unwrap();
    LinkStore::new(work.path().join("links.json"))
        .save(
            &["https://example.com/docs".to_string()],
            NavNode::folder(
                "https://example.com/docs",
                vec![NavNode::new("A", Some("https://example.com/docs/a".to_string()))],
            ),
        )
        .unwrap();

    let mut opts = options(Stage::Scrape, work.path(), vec![]);
    opts.dry_run = true;
    let report = Pipeline::new(opts, NoBrowser).run().await.unwrap();

    assert_eq!(report.checkpoint.unwrap().flat_links.len(), 1);
    assert!(!work.path().join("out").exists());
}
