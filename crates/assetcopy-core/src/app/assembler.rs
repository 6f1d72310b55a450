//! Asset assembler - 外部コンテナの blob をアセットへ取り込む
//!
//! # フロー
//! 1. アセット作成（一意な名前）
//! 2. 24 時間の書き込みポリシー + SAS ロケーター → コンテナ名を決定
//! 3. コンテナ作成（初回のみ blob 単位の公開読み取りを設定）
//! 4. blob ごとに: ファイル登録 → コピー → サイズ記録
//! 5. ロケーター削除 → ポリシー削除
//! 6. プライマリファイル選択

use chrono::Duration;
use tracing::{info, warn};

use super::context::MigrationContext;
use super::copy::copy_blob;
use super::primary::select_primary;
use crate::domain::{
    AccessPermissions, Asset, AssetFile, ContainerRef, CopyRecord, CopyReport, LocatorRequest, LocatorType,
    PublicAccess,
};
use crate::error::MigrateError;

pub const WRITE_POLICY_NAME: &str = "writePolicy";
pub const WRITE_POLICY_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct AssembledAsset {
    pub asset: Asset,
    pub primary: AssetFile,
    pub copy_report: CopyReport,
}

/// Build a new asset from every blob in `source`.
///
/// Copy failures classified as transient end up in the report. Everything
/// else (listing, signing, existence checks, registration) aborts and leaves
/// already-created remote objects in place.
pub async fn assemble_asset(
    ctx: &MigrationContext,
    source: &ContainerRef,
) -> Result<AssembledAsset, MigrateError> {
    let media = ctx.media.as_ref();

    let name = ctx.names.unique_name(&ctx.options.asset_name_prefix);
    let asset = media.create_asset(&name).await?;
    info!(asset = %asset.id, name = %asset.name, "asset created");

    let policy = media
        .create_access_policy(
            WRITE_POLICY_NAME,
            Duration::hours(WRITE_POLICY_HOURS),
            AccessPermissions::Write,
        )
        .await?;
    let locator = media
        .create_locator(LocatorRequest {
            locator_type: LocatorType::Sas,
            asset_id: asset.id.clone(),
            access_policy_id: policy.id.clone(),
            start_time: None,
        })
        .await?;

    let destination = locator
        .container_name()
        .map(ContainerRef::new)
        .ok_or_else(|| MigrateError::LocatorPath {
            locator: locator.id.to_string(),
            path: locator.path.clone(),
        })?;
    if ctx
        .destination
        .create_container_if_not_exists(&destination)
        .await?
    {
        ctx.destination
            .set_public_access(&destination, PublicAccess::Blob)
            .await?;
        info!(container = %destination, "created asset container");
    }

    let blobs = ctx.source.list_blobs(source).await?;
    let mut report = CopyReport::new();
    for blob in &blobs {
        let mut file = media.create_asset_file(&asset.id, &blob.name).await?;
        let record = match copy_blob(
            ctx.source.as_ref(),
            ctx.destination.as_ref(),
            &destination,
            blob,
            ctx.clock.as_ref(),
        )
        .await
        {
            Ok(record) => record,
            Err(e) if !e.kind().is_fatal() => {
                warn!(blob = %blob.name, kind = ?e.kind(), error = %e, "copy failed, continuing");
                CopyRecord::failed(&blob.name, blob.size, e.to_string())
            }
            Err(e) => return Err(e),
        };

        // size comes from the source listing, even when the copy failed or is still running
        file.content_file_size = blob.size;
        media.update_asset_file(&file).await?;
        report.push(record);
    }

    media.delete_locator(&locator.id).await?;
    media.delete_access_policy(&policy.id).await?;

    let counts = report.counts();
    if counts.failed > 0 {
        warn!(
            asset = %asset.id,
            failed = counts.failed,
            "some copies could not be started"
        );
    }
    info!(
        asset = %asset.id,
        copied = counts.copied,
        skipped = counts.skipped,
        failed = counts.failed,
        "copy loop finished"
    );

    let primary = select_primary(media, &asset.id, &ctx.options.manifest_extension).await?;
    Ok(AssembledAsset {
        asset,
        primary,
        copy_report: report,
    })
}
