//! biocorpus: builds a searchable biomedical corpus from BioC XML files and
//! web pages.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use biocorpus_common::Embedder;
use biocorpus_ingestion::embedding::EmbeddingClient;
use biocorpus_ingestion::merge::merge_metadata;
use biocorpus_ingestion::pipeline::{inspect, run_build, run_reindex, run_scrape, ArtifactPaths, EmbedSettings};
use biocorpus_ingestion::sources::web::WebFetcher;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "biocorpus")]
#[command(about = "Build an aligned vector index and metadata corpus from biomedical documents")]
#[command(version)]
struct Cli {
    /// Path to biocorpus.toml (defaults to BIOCORPUS_CONFIG, then ./biocorpus.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the aligned artifact pair.
#[derive(clap::Args, Debug, Default)]
struct ArtifactArgs {
    /// Vector index artifact
    #[arg(long)]
    index: Option<PathBuf>,
    /// Metadata artifact
    #[arg(long)]
    metadata: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalise a folder of BioC XML files, embed them and write the index and metadata
    Build {
        /// Folder of BioC XML files
        #[arg(long)]
        xml_dir: Option<PathBuf>,
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
    /// Fetch web pages into a metadata batch
    Scrape {
        /// Output batch file
        #[arg(long)]
        out: Option<PathBuf>,
        /// URLs to fetch; replaces the configured list
        urls: Vec<String>,
    },
    /// Append a metadata batch to the metadata artifact, keeping a backup
    Merge {
        /// Metadata artifact to extend
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Batch to append
        #[arg(long)]
        batch: Option<PathBuf>,
        /// Where to copy the metadata artifact before it is replaced
        #[arg(long)]
        backup: Option<PathBuf>,
    },
    /// Re-embed the metadata artifact and rewrite the index to match it
    Reindex {
        #[command(flatten)]
        artifacts: ArtifactArgs,
        #[arg(long)]
        backup: Option<PathBuf>,
    },
    /// Check that the index and metadata are aligned and report on them
    Inspect {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
}

impl ArtifactArgs {
    fn resolve(self, cfg: &Config) -> ArtifactPaths {
        ArtifactPaths {
            index: self.index.unwrap_or_else(|| cfg.paths.index.clone()),
            metadata: self.metadata.unwrap_or_else(|| cfg.paths.metadata.clone()),
        }
    }
}

fn print_report<T: Serialize>(report: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

async fn embedder(cfg: &Config) -> anyhow::Result<(EmbeddingClient, EmbedSettings)> {
    let client_cfg = cfg.embedding.to_client_config();
    let settings = EmbedSettings {
        batch_size: client_cfg.batch_size,
        timeout: client_cfg.timeout(),
    };
    let client = EmbeddingClient::new(client_cfg)
        .await
        .context("initialising embedding backend")?;
    info!(model = client.model_name(), dim = client.dimension(), "Embedding backend ready");
    Ok((client, settings))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Build { xml_dir, artifacts } => {
            let xml_dir = xml_dir.unwrap_or_else(|| cfg.paths.xml_dir.clone());
            let paths = artifacts.resolve(&cfg);
            let (client, settings) = embedder(&cfg).await?;
            let report = run_build(&xml_dir, &paths, &client, settings)
                .await
                .with_context(|| format!("building corpus from {}", xml_dir.display()))?;
            print_report(&report)?;
        }
        Commands::Scrape { out, urls } => {
            let out = out.unwrap_or_else(|| cfg.paths.web_batch.clone());
            let urls = if urls.is_empty() { cfg.web.urls.clone() } else { urls };
            let fetcher = WebFetcher::new(cfg.web.timeout(), cfg.web.defaults())?;
            let report = run_scrape(&fetcher, &urls, &out).await?;
            print_report(&report)?;
        }
        Commands::Merge { metadata, batch, backup } => {
            let metadata = metadata.unwrap_or_else(|| cfg.paths.metadata.clone());
            let batch = batch.unwrap_or_else(|| cfg.paths.web_batch.clone());
            let backup = backup.unwrap_or_else(|| cfg.paths.backup.clone());
            let report = merge_metadata(&metadata, &batch, &backup)
                .with_context(|| format!("merging {} into {}", batch.display(), metadata.display()))?;
            print_report(&report)?;
        }
        Commands::Reindex { artifacts, backup } => {
            let paths = artifacts.resolve(&cfg);
            let backup = backup.unwrap_or_else(|| cfg.paths.backup.clone());
            let (client, settings) = embedder(&cfg).await?;
            let report = run_reindex(&paths, &backup, &client, settings).await?;
            print_report(&report)?;
        }
        Commands::Inspect { artifacts } => {
            let paths = artifacts.resolve(&cfg);
            let report = inspect(&paths)
                .with_context(|| format!("inspecting {}", paths.index.display()))?;
            print_report(&report)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["biocorpus", "inspect"]).unwrap();
        assert!(matches!(cli.command, Commands::Inspect { .. }));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_scrape_urls_and_global_config() {
        let cli = Cli::try_parse_from([
            "biocorpus", "scrape", "--config", "alt.toml", "https://a.example", "https://b.example",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        match cli.command {
            Commands::Scrape { urls, out } => {
                assert_eq!(urls.len(), 2);
                assert!(out.is_none());
            }
            _ => panic!("expected scrape"),
        }
    }

    #[test]
    fn test_artifact_overrides() {
        let cli = Cli::try_parse_from(["biocorpus", "build", "--index", "x.index"]).unwrap();
        let Commands::Build { artifacts, xml_dir } = cli.command else {
            panic!("expected build");
        };
        assert!(xml_dir.is_none());
        let paths = artifacts.resolve(&Config::default());
        assert_eq!(paths.index, PathBuf::from("x.index"));
        assert_eq!(paths.metadata, PathBuf::from("data/lung_metadata.json"));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["biocorpus", "serve"]).is_err());
    }
}
