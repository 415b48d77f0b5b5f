//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror site mirror.

use anyhow::{bail, Context};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use sumi_mirror::config::{
    load_config_with_hash, validate, Config, OverwritePolicy, WriteFailureAction,
};
use sumi_mirror::output::{write_check_report, Confirm, FixedAnswer, StdinConfirm};
use sumi_mirror::url::is_url;
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: A polite recursive site mirror
///
/// Sumi-Mirror downloads a page together with the pages, images and
/// stylesheets it links to, honoring robots.txt and pacing its requests,
/// then rewrites the saved files to point at the local copies.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version)]
#[command(about = "A polite recursive site mirror", long_about = None)]
struct Cli {
    /// Seed URLs to mirror ("-" reads one from stdin)
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of hierarchy levels to follow below each seed
    #[arg(short = 'r', long = "recursive", value_name = "DEPTH")]
    depth: Option<u32>,

    /// Destination directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Save format (%(file)s, %(num)d, %(ext)s, %(root)s)
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<String>,

    /// Seconds between requests
    #[arg(short = 'I', long, value_name = "SECS")]
    interval: Option<f64>,

    /// Maximum number of targets taken from each page
    #[arg(short = 'M', long = "limit", value_name = "N")]
    limit: Option<usize>,

    /// Ignore references until one ends with this marker
    #[arg(long = "start", value_name = "MARKER")]
    start: Option<String>,

    /// Do not climb above the seed's directory
    #[arg(long)]
    no_parent: bool,

    /// Follow links to other sites
    #[arg(long)]
    download_external: bool,

    /// Do not download images
    #[arg(long)]
    no_content: bool,

    /// Do not download linked pages and stylesheets
    #[arg(long)]
    no_body: bool,

    /// Do not rewrite links to local paths
    #[arg(long)]
    no_conversion: bool,

    /// Skip URLs already in the download history
    #[arg(long)]
    no_downloaded: bool,

    /// Only check whether linked targets exist
    #[arg(short = 'C', long)]
    check: bool,

    /// Number of rewrite workers (1-4)
    #[arg(short = 'm', long = "multiprocess", value_name = "N")]
    workers: Option<usize>,

    /// Extra attempts after a connection failure
    #[arg(long, value_name = "N")]
    reconnect: Option<u32>,

    /// Read timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Proxy URL for all requests
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Extra request header (repeatable)
    #[arg(short = 'H', long = "header", value_name = "KEY=VALUE")]
    headers: Vec<String>,

    /// User-Agent header
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Do not verify TLS certificates
    #[arg(long)]
    insecure: bool,

    /// Answer yes to every question (overwrites existing files)
    #[arg(short, long)]
    yes: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli)?;
    validate(&config).context("invalid settings")?;

    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(FixedAnswer(true))
    } else {
        Arc::new(StdinConfirm)
    };

    let seeds = collect_seeds(&cli.urls)?;
    let mut stdout = io::stdout();

    for seed in &seeds {
        let outcome = sumi_mirror::mirror(config.clone(), seed, Arc::clone(&confirm))
            .await
            .with_context(|| format!("mirroring {} failed", seed))?;

        if config.crawl.check_only {
            write_check_report(&mut stdout, &outcome.checks)?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(io::stderr)
        .init();
}

/// Folds command-line flags into the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    let crawl = &mut config.crawl;
    if let Some(depth) = cli.depth {
        crawl.max_depth = depth;
    }
    if let Some(format) = &cli.format {
        crawl.save_format = format.clone();
    }
    if let Some(interval) = cli.interval {
        crawl.interval = interval;
    }
    if let Some(limit) = cli.limit {
        crawl.max_items = limit;
    }
    if let Some(marker) = &cli.start {
        crawl.start_marker = Some(marker.clone());
    }
    if let Some(workers) = cli.workers {
        crawl.rewrite_workers = workers;
    }
    if let Some(reconnect) = cli.reconnect {
        crawl.reconnect_attempts = reconnect;
    }
    crawl.follow_parent &= !cli.no_parent;
    crawl.follow_external |= cli.download_external;
    crawl.download_content &= !cli.no_content;
    crawl.download_body &= !cli.no_body;
    crawl.rewrite_links &= !cli.no_conversion;
    crawl.skip_downloaded |= cli.no_downloaded;
    crawl.check_only |= cli.check;

    let http = &mut config.http;
    if let Some(timeout) = cli.timeout {
        http.read_timeout = timeout;
    }
    if let Some(proxy) = &cli.proxy {
        http.proxy = Some(proxy.clone());
    }
    if let Some(user_agent) = &cli.user_agent {
        http.user_agent = user_agent.clone();
    }
    http.verify_tls &= !cli.insecure;
    for header in &cli.headers {
        let Some((name, value)) = header.split_once('=') else {
            bail!("header '{}' is not in KEY=VALUE form", header);
        };
        http.headers
            .insert(name.trim().to_string(), value.trim().to_string());
    }

    if let Some(output) = &cli.output {
        config.output.destination = output.clone();
    }
    if cli.yes {
        config.output.overwrite = OverwritePolicy::Always;
        if config.output.on_write_error == WriteFailureAction::Ask {
            config.output.on_write_error = WriteFailureAction::Retry;
        }
    }

    Ok(())
}

/// Expands "-" into a URL read from stdin and checks every seed
fn collect_seeds(urls: &[String]) -> anyhow::Result<Vec<String>> {
    let mut seeds = Vec::with_capacity(urls.len());

    for url in urls {
        let seed = if url == "-" {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read a URL from stdin")?;
            line.trim().to_string()
        } else {
            url.trim().to_string()
        };

        if !is_url(&seed) {
            bail!("'{}' is not an http(s) URL", seed);
        }
        seeds.push(seed);
    }

    Ok(seeds)
}
