use crate::CLAP_STYLING;
use clap::{ArgAction, arg, value_parser};
use std::path::PathBuf;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("navmirror")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("navmirror")
        .about("Mirror a documentation site by walking its collapsible navigation tree")
        .styles(CLAP_STYLING)
        .arg(
            arg!(--"stage" <STAGE>)
                .required(false)
                .help("Which part of the pipeline to run")
                .value_parser(["extract", "scrape", "index", "all"])
                .default_value("all"),
        )
        .arg(
            arg!(-u --"start-url" <URLS>)
                .required(false)
                .help("Navigation root(s) to extract from, comma separated (needed for extract and all)"),
        )
        .arg(
            arg!(-o --"output-dir" <DIR>)
                .required(false)
                .help("Where mirrored pages and the index are written")
                .default_value("./mirror"),
        )
        .arg(
            arg!(-c --"checkpoint" <PATH>)
                .required(false)
                .help("Link checkpoint shared between stages")
                .default_value("links.json"),
        )
        .arg(
            arg!(--"incremental")
                .required(false)
                .help("Keep the output directory and skip pages already saved")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"dry-run")
                .required(false)
                .help("Discover and list what would be fetched without fetching it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"profile" <PATH>)
                .required(false)
                .help("JSON site profile overriding the navigation selectors")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"doc-prefix" <PATH>)
                .required(false)
                .help("Only keep links whose path starts with this prefix (default: /docs)"),
        )
        .arg(
            arg!(--"pacing-ms" <MS>)
                .required(false)
                .help("Delay between page fetches")
                .value_parser(value_parser!(u64))
                .default_value("500"),
        )
        .arg(
            arg!(--"timeout-ms" <MS>)
                .required(false)
                .help("Per-page load timeout")
                .value_parser(value_parser!(u64))
                .default_value("30000"),
        )
        .arg(
            arg!(--"static")
                .required(false)
                .help("Fetch pages over plain HTTP instead of a headless browser")
                .action(ArgAction::SetTrue)
                .conflicts_with("chrome"),
        )
        .arg(
            arg!(--"chrome" <PATH>)
                .required(false)
                .help("Chromium executable (default: $NAVMIRROR_CHROME, then PATH)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(arg!(-q --"quiet" "Suppress progress and listings").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug)")
                .required(false)
                .action(ArgAction::Count),
        )
}
