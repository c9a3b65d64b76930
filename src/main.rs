use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nist_resolver::config::{get_config, load_config, Config};
use nist_resolver::output::{to_asciibib, to_hash, to_xml, to_yaml, XmlOptions};
use nist_resolver::sources::{IndexSource, PubsExportSource};
use nist_resolver::utils::HttpClient;
use nist_resolver::{GetOptions, NistBibliography, NistItem, SearchOptions};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolve NIST publication references to bibliographic records
#[derive(Parser, Debug)]
#[command(name = "nist-resolver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Resolve NIST publication references to bibliographic records",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress everything but errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Concurrent fetches per batch (overrides the configuration)
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Serialization of a resolved item
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// `bibitem` XML
    Xml,
    /// `bibdata` XML with the NIST extension block
    Bibdata,
    Yaml,
    Json,
    /// Line-oriented plain text
    Asciibib,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a reference to a single record
    #[command(alias = "g")]
    Get {
        /// Reference, e.g. "SP 800-57 Part 1 Rev. 4" or "NIST.IR.8200"
        reference: String,

        /// Publication year
        #[arg(long, short)]
        year: Option<i32>,

        /// Match any part of a multi-part document
        #[arg(long)]
        all_parts: bool,

        /// Draft stage, e.g. PD, IPD, 2PD, FPD
        #[arg(long)]
        stage: Option<String>,

        #[arg(long, short, value_enum, default_value_t = Format::Xml)]
        format: Format,
    },

    /// List candidate records for a reference or title fragment
    #[command(alias = "s")]
    Search {
        text: String,

        #[arg(long, short)]
        year: Option<i32>,

        /// Search drafts (any value containing PD)
        #[arg(long)]
        stage: Option<String>,

        /// Print JSON instead of one line per hit
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear the local data cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum CacheAction {
    /// Show cached archives
    Status,
    /// Delete cached archives
    Clear,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("nist_resolver={}", level)),
    );

    let json = config.logging.format.as_deref() == Some("json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn render(item: &NistItem, format: Format) -> Result<String> {
    let text = match format {
        Format::Xml => to_xml(item, XmlOptions::default())?,
        Format::Bibdata => to_xml(item, XmlOptions { bibdata: true })?,
        Format::Yaml => to_yaml(item)?,
        Format::Json => serde_json::to_string_pretty(&to_hash(item)?)?,
        Format::Asciibib => to_asciibib(item, ""),
    };
    Ok(text)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(Some(path))
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => get_config().context("failed to load configuration")?,
    };
    if let Some(workers) = cli.workers {
        config.resolver.workers = workers;
    }
    init_tracing(&cli, &config);

    match cli.command {
        Commands::Get {
            reference,
            year,
            all_parts,
            stage,
            format,
        } => {
            let bib = NistBibliography::from_config(&config)?;
            let options = GetOptions {
                all_parts,
                stage,
                ..GetOptions::default()
            };
            match bib.get(&reference, year, options).await? {
                Some(item) => println!("{}", render(&item, format)?.trim_end()),
                None => std::process::exit(1),
            }
        }

        Commands::Search {
            text,
            year,
            stage,
            json,
        } => {
            let bib = NistBibliography::from_config(&config)?;
            let options = SearchOptions { stage };
            let hits = bib.search(&text, year, options).await?;

            if json {
                let rows: Vec<serde_json::Value> = hits
                    .iter()
                    .map(|hit| {
                        serde_json::json!({
                            "code": hit.code.canonical(),
                            "title": hit.title,
                            "url": hit.url,
                            "status": hit.status,
                            "release_date": hit.release_date.map(|d| d.to_string()),
                            "source": hit.source_id(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for hit in hits.iter() {
                    println!(
                        "{}\t{}\t{}\t{}",
                        hit.code,
                        hit.release_date.map(|d| d.to_string()).unwrap_or_default(),
                        hit.status.as_deref().unwrap_or("-"),
                        hit.title.as_deref().unwrap_or("")
                    );
                }
                if hits.is_empty() {
                    eprintln!("no candidates for {}", text);
                }
            }
        }

        Commands::Cache { action } => {
            let client = HttpClient::from_config(&config.http)?;
            let feed = PubsExportSource::from_config(&config, client.clone());
            let index = IndexSource::from_config(&config, client);

            match action {
                CacheAction::Status => {
                    for status in [feed.cache().status(), index.cache().status()] {
                        if status.exists {
                            println!(
                                "{}\t{} bytes\t{}",
                                status.path.display(),
                                status.size_bytes,
                                status
                                    .modified
                                    .map(|m| m.to_rfc3339())
                                    .unwrap_or_else(|| "-".to_string())
                            );
                        } else {
                            println!("{}\tmissing", status.path.display());
                        }
                    }
                }
                CacheAction::Clear => {
                    feed.cache().clear().await?;
                    index.cache().clear().await?;
                    println!("cache cleared: {}", config.data.directory.display());
                }
            }
        }
    }

    Ok(())
}
