use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use navmirror_core::launcher::{BrowserLauncher, ChromiumLauncher, StaticLauncher};
use navmirror_core::pipeline::{Pipeline, PipelineOptions, RunReport, Stage};
use navmirror_core::summary::{format_crawl_summary, format_fetch_plan, format_link_listing};
use navmirror_scanner::profile::SiteProfile;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Split a comma separated `--start-url` value, dropping blanks.
pub fn parse_start_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Turn parsed arguments into pipeline options. Nothing here touches the
/// network.
pub fn build_options(args: &ArgMatches) -> Result<PipelineOptions> {
    let stage: Stage = args
        .get_one::<String>("stage")
        .map(String::as_str)
        .unwrap_or("all")
        .parse()?;

    let mut profile = match args.get_one::<PathBuf>("profile") {
        Some(path) => {
            let path = expand_path(&path.to_string_lossy());
            SiteProfile::from_file(&path)
                .with_context(|| format!("Failed to load site profile {}", path.display()))?
        }
        None => SiteProfile::default(),
    };
    if let Some(prefix) = args.get_one::<String>("doc-prefix") {
        profile = profile.with_doc_path_prefix(prefix.clone());
    }

    let mut options = PipelineOptions {
        stage,
        incremental: args.get_flag("incremental"),
        dry_run: args.get_flag("dry-run"),
        start_urls: args
            .get_one::<String>("start-url")
            .map(|raw| parse_start_urls(raw))
            .unwrap_or_default(),
        profile,
        ..PipelineOptions::default()
    };
    if let Some(dir) = args.get_one::<String>("output-dir") {
        options.output_dir = expand_path(dir);
    }
    if let Some(path) = args.get_one::<String>("checkpoint") {
        options.checkpoint_path = expand_path(path);
    }
    if let Some(ms) = args.get_one::<u64>("pacing-ms") {
        options.pacing = Duration::from_millis(*ms);
    }
    if let Some(ms) = args.get_one::<u64>("timeout-ms") {
        options.open.timeout = Duration::from_millis(*ms);
    }

    options.validate()?;
    Ok(options)
}

/// What to print once a stage has finished.
pub fn render_report(report: &RunReport, options: &PipelineOptions) -> String {
    let mut out = String::new();

    if let Some(checkpoint) = &report.checkpoint
        && matches!(report.stage, Stage::Extract | Stage::All)
    {
        out.push_str(&format_link_listing(&checkpoint.tree));
        out.push_str(&format!(
            "\n{} Checkpoint: {} ({} links)\n",
            "✓".green().bold(),
            options.checkpoint_path.display(),
            checkpoint.total_count
        ));
    }

    if report.dry_run
        && let Some(checkpoint) = &report.checkpoint
        && matches!(report.stage, Stage::Scrape | Stage::All)
    {
        out.push_str(&format_fetch_plan(
            &checkpoint.flat_links,
            &options.output_dir,
            options.incremental,
        ));
    }

    match (&report.crawl, report.stage) {
        (Some(crawl), _) => {
            out.push_str(&format_crawl_summary(crawl, report.index_path.as_deref()));
        }
        (None, Stage::Index) => match &report.index_path {
            Some(path) => out.push_str(&format!("{} Index: {}\n", "✓".green().bold(), path.display())),
            None => out.push_str("Dry run: index not written\n"),
        },
        _ => {}
    }
    out
}

async fn run_with<L: BrowserLauncher>(
    options: PipelineOptions,
    launcher: L,
    progress: Option<ProgressBar>,
) -> Result<RunReport> {
    let mut pipeline = Pipeline::new(options, launcher);
    if let Some(pb) = progress.clone() {
        pipeline = pipeline.with_progress_callback(Arc::new(move |idx: usize, total: usize, url: &str| {
            pb.set_length(total as u64);
            pb.set_position(idx as u64);
            pb.set_message(url.to_string());
        }));
    }

    let result = pipeline.run().await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    Ok(result?)
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run the selected stage and print its outcome. Errors returned here are
/// fatal; individual page failures only show up in the summary.
pub async fn handle_run(args: &ArgMatches) -> Result<()> {
    let options = build_options(args)?;
    let quiet = args.get_flag("quiet");
    debug!(
        "Stage {} into {} (checkpoint {})",
        options.stage,
        options.output_dir.display(),
        options.checkpoint_path.display()
    );
    let fetches = matches!(options.stage, Stage::Scrape | Stage::All) && !options.dry_run;
    let progress = (!quiet && fetches).then(progress_bar);

    let report = if args.get_flag("static") {
        run_with(options.clone(), StaticLauncher, progress).await?
    } else {
        let launcher = ChromiumLauncher {
            chrome_path: args.get_one::<PathBuf>("chrome").cloned(),
        };
        run_with(options.clone(), launcher, progress).await?
    };

    let rendered = render_report(&report, &options);
    if quiet {
        if let Some(crawl) = &report.crawl {
            println!(
                "saved {} failed {} skipped {}",
                crawl.success_count,
                crawl.failed_count(),
                crawl.skipped_count
            );
        }
    } else {
        print!("{}", rendered);
    }
    Ok(())
}
