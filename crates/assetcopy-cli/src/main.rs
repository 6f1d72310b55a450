use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use assetcopy_core::app::{MigrationOptions, PipelineBuilder, run_pipeline};
use assetcopy_core::config::Settings;
use assetcopy_core::impls::{AzureBlobStore, MediaServicesClient};

/// Upload a directory of media files and publish it as a streaming asset.
#[derive(Debug, Parser)]
#[command(name = "assetcopy", version)]
struct Cli {
    /// JSON settings file; the environment (and `.env`) is used when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Local directory whose files are uploaded
    #[arg(long)]
    local_dir: Option<PathBuf>,

    /// Container in the external storage account that receives the upload
    #[arg(long)]
    container: Option<String>,

    /// Print the full run report as JSON instead of only the URL
    #[arg(long)]
    json: bool,

    /// Exit immediately instead of waiting for Enter
    #[arg(long)]
    no_pause: bool,
}

fn init_tracing() {
    // stdout carries only the result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_json_file(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?,
        None => Settings::from_env().context("failed to read settings from the environment")?,
    };
    if let Some(dir) = &cli.local_dir {
        settings.local_media_dir = dir.clone();
    }
    if let Some(container) = &cli.container {
        settings.source_container = container.clone();
    }
    settings.validate().context("invalid settings")?;
    Ok(settings)
}

async fn wait_for_enter() -> anyhow::Result<()> {
    eprintln!("Press Enter to exit...");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read stdin")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let external = AzureBlobStore::new(&settings.external_storage)
        .context("external storage account")?;
    let media_storage = AzureBlobStore::new(&settings.media_storage)
        .context("media services storage account")?;
    let media = MediaServicesClient::new(
        settings.media_services.clone(),
        settings.media_endpoints.clone(),
    )
    .context("media services client")?;

    let ctx = PipelineBuilder::new(MigrationOptions::from(&settings))
        .source(Arc::new(external))
        .destination(Arc::new(media_storage))
        .media(Arc::new(media))
        .build()?;

    let report = run_pipeline(&ctx).await.context("migration failed")?;

    let counts = report.copy_report.counts();
    info!(
        asset = %report.asset.name,
        primary = %report.primary_file,
        uploaded = report.uploaded.len(),
        copied = counts.copied,
        skipped = counts.skipped,
        failed = counts.failed,
        "migration finished"
    );
    for record in report.copy_report.failures() {
        warn!(blob = %record.blob, reason = ?record.reason, "copy failed");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.streaming_url);
    }

    if !cli.no_pause {
        wait_for_enter().await?;
    }
    Ok(())
}
