//! run_pipeline - upload → assemble → publish を順番に実行

use serde::Serialize;
use tracing::info;

use super::assembler::assemble_asset;
use super::context::MigrationContext;
use super::publisher::publish;
use super::uploader::upload_directory;
use crate::domain::{Asset, BlobRef, CopyReport};
use crate::error::MigrateError;

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub uploaded: Vec<BlobRef>,
    pub asset: Asset,
    pub copy_report: CopyReport,
    /// Name of the file marked primary on the asset.
    pub primary_file: String,
    pub streaming_url: String,
}

/// Run the whole migration once. Every stage is awaited in order.
pub async fn run_pipeline(ctx: &MigrationContext) -> Result<MigrationReport, MigrateError> {
    let opts = &ctx.options;

    info!(
        dir = %opts.local_media_dir.display(),
        container = %opts.source_container,
        "uploading local files"
    );
    let uploaded = upload_directory(
        ctx.source.as_ref(),
        &opts.local_media_dir,
        &opts.source_container,
    )
    .await?;

    let assembled = assemble_asset(ctx, &uploaded.container).await?;

    let publication = publish(
        ctx.media.as_ref(),
        ctx.clock.as_ref(),
        &assembled.asset.id,
        &opts.manifest_extension,
    )
    .await?;
    info!(
        asset = %assembled.asset.id,
        primary = %assembled.primary.name,
        manifest = %publication.manifest_name,
        "published"
    );

    Ok(MigrationReport {
        uploaded: uploaded.blobs,
        asset: assembled.asset,
        copy_report: assembled.copy_report,
        primary_file: assembled.primary.name,
        streaming_url: publication.url,
    })
}
