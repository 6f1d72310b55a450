//! Blob copy decision (one blob, source account → destination container).
//!
//! コピー開始の失敗は `MigrateError::CopyStart`（Transient）として返します。
//! 続行するかどうかは呼び出し側のループが `ErrorKind` で判断します。
//! 署名と存在確認の失敗はそのまま上に伝わります。

use chrono::Duration;
use tracing::info;

use crate::domain::{BlobRef, ContainerRef, CopyRecord};
use crate::error::MigrateError;
use crate::ports::{BlobStore, Clock};

/// Lifetime of the read signature handed to the copy service.
pub const READ_SIGNATURE_TTL_HOURS: i64 = 24;

/// Copy `blob` into `dest_container` under the same name unless it already exists there.
///
/// The copy is started but not polled; `Copied` means the service accepted it.
pub async fn copy_blob(
    source: &dyn BlobStore,
    dest: &dyn BlobStore,
    dest_container: &ContainerRef,
    blob: &BlobRef,
    clock: &dyn Clock,
) -> Result<CopyRecord, MigrateError> {
    let expires_at = clock.now() + Duration::hours(READ_SIGNATURE_TTL_HOURS);
    let signature = source.read_signature(&blob.container, &blob.name, expires_at)?;

    if dest.exists(dest_container, &blob.name).await? {
        info!(blob = %blob.name, container = %dest_container, "already present, skipping");
        return Ok(CopyRecord::skipped(&blob.name, blob.size));
    }

    let source_url = format!(
        "{}{}",
        source.blob_url(&blob.container, &blob.name),
        signature
    );
    let handle = dest
        .start_copy(dest_container, &blob.name, &source_url)
        .await
        .map_err(|source| MigrateError::CopyStart {
            blob: blob.name.clone(),
            source,
        })?;
    info!(
        blob = %blob.name,
        container = %dest_container,
        status = ?handle.status,
        "copy started"
    );
    Ok(CopyRecord::copied(&blob.name, blob.size))
}
