use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paperfetch::config::{find_config_file, load_config, load_env_config, Config};
use paperfetch::{storage, ui, Resolver, SemanticScholar};

#[derive(Parser, Debug)]
#[command(name = "paperfetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve DOIs, PubMed ids, arXiv references and URLs to PDF files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Attempts per resolution
    #[arg(long, global = true)]
    retries: Option<u32>,

    /// User agent sent to mirrors
    #[arg(long, global = true)]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download papers by DOI, PMID, arXiv reference or URL
    #[command(alias = "d")]
    Download {
        /// Paper identifiers
        #[arg(required = true)]
        identifiers: Vec<String>,

        /// Directory to save PDFs in
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,

        /// Resolutions running at once
        #[arg(long, short = 'j')]
        concurrency: Option<usize>,
    },

    /// Search Semantic Scholar for papers
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Download every result
        #[arg(long)]
        download: bool,

        /// Directory to save PDFs in
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,
    },

    /// Discover and list the current mirrors
    Mirrors,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("paperfetch={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = build_config(&cli)?;

    match cli.command {
        Commands::Download {
            identifiers,
            output_dir,
            concurrency,
        } => {
            let resolver = Resolver::new(&config).context("Failed to create HTTP client")?;
            let directory = output_dir.unwrap_or_else(|| config.downloads.directory.clone());
            let concurrency = concurrency.unwrap_or(config.downloads.concurrency);
            download_all(&resolver, &identifiers, &directory, concurrency, cli.quiet).await
        }
        Commands::Search {
            query,
            limit,
            download,
            output_dir,
        } => {
            let search = SemanticScholar::new(&config.search, &config.network)?;
            let limit = limit.unwrap_or(search.default_limit());
            let result = search.search(&query, limit).await?;

            if let Some(error) = &result.error {
                println!("{} {}", ui::status_icon(ui::Status::Search), error);
                return Ok(());
            }
            for (i, paper) in result.papers.iter().enumerate() {
                println!("{}\n", ui::format_paper(i + 1, paper));
            }

            if download {
                let identifiers: Vec<String> = result
                    .papers
                    .iter()
                    .map(|paper| paper.identifier().to_string())
                    .collect();
                let resolver = Resolver::new(&config).context("Failed to create HTTP client")?;
                let directory = output_dir.unwrap_or_else(|| config.downloads.directory.clone());
                download_all(
                    &resolver,
                    &identifiers,
                    &directory,
                    config.downloads.concurrency,
                    cli.quiet,
                )
                .await?;
            }
            Ok(())
        }
        Commands::Mirrors => {
            let resolver = Resolver::new(&config).context("Failed to create HTTP client")?;
            let set = resolver
                .mirrors()
                .refresh()
                .await
                .context("Mirror discovery failed")?;

            if set.is_empty() {
                bail!("No mirrors found at {}", config.mirrors.listing_url);
            }
            for mirror in set.mirrors() {
                let marker = if Some(mirror.as_str()) == set.current() { "*" } else { " " };
                println!("{} {}", marker, mirror);
            }
            Ok(())
        }
    }
}

/// Configuration from file or environment, with CLI flags on top
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config {
        load_config(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else if let Some(path) = find_config_file() {
        tracing::info!("Using config file: {}", path.display());
        load_config(&path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        load_env_config()?
    };

    if let Some(timeout) = cli.timeout {
        config.network.timeout_secs = timeout;
    }
    if let Some(retries) = cli.retries {
        config.network.max_retries = retries;
    }
    if let Some(user_agent) = &cli.user_agent {
        config.network.user_agent = user_agent.clone();
    }
    Ok(config)
}

async fn download_all(
    resolver: &Resolver,
    identifiers: &[String],
    directory: &Path,
    concurrency: usize,
    quiet: bool,
) -> Result<()> {
    let pb = ui::create_progress_bar(identifiers.len() as u64, "Downloading", quiet || identifiers.len() < 2);
    let artifacts = resolver
        .resolve_batch_with_progress(identifiers, concurrency, |_| pb.inc(1))
        .await;
    pb.finish_and_clear();

    let mut failures = 0;
    for (identifier, artifact) in identifiers.iter().zip(&artifacts) {
        if !artifact.is_success() {
            failures += 1;
            println!("{}", ui::format_download_line(identifier, artifact, None));
            continue;
        }

        match storage::save_artifact(directory, artifact).await {
            Ok(path) => {
                if !quiet {
                    let path = path.display().to_string();
                    println!("{}", ui::format_download_line(identifier, artifact, Some(&path)));
                }
            }
            Err(e) => {
                failures += 1;
                println!("{} {}: {}", ui::status_icon(ui::Status::Error), identifier, e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} downloads failed", failures, identifiers.len());
    }
    Ok(())
}
