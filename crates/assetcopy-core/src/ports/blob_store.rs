//! BlobStore port - Blob ストレージ（Azure Blob / InMemory）
//!
//! 1 つの BlobStore は 1 つのストレージアカウントに対応します。
//! 外部アカウント（アップロード先・コピー元）とメディアサービス配下のアカウント
//! （コピー先）はそれぞれ別インスタンスになります。

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{BlobRef, ContainerRef, CopyHandle, PublicAccess};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed during {operation}: {message}")]
    Request { operation: &'static str, message: String },

    #[error("storage {operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("invalid storage response: {0}")]
    InvalidResponse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// BlobStore はストレージアカウントへの操作を提供
///
/// # 設計原則
/// - 各メソッドは REST 呼び出し 1 回（List のページングを除く）に対応
/// - リトライはしない（呼び出し側のポリシーに従う）
/// - `blob_url` / `read_signature` はローカル計算のみでネットワークを使わない
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Storage account name, used for logging.
    fn account(&self) -> &str;

    /// Create the container; `Ok(true)` when it was newly created.
    async fn create_container_if_not_exists(
        &self,
        container: &ContainerRef,
    ) -> Result<bool, StorageError>;

    async fn set_public_access(
        &self,
        container: &ContainerRef,
        access: PublicAccess,
    ) -> Result<(), StorageError>;

    async fn exists(&self, container: &ContainerRef, blob: &str) -> Result<bool, StorageError>;

    /// Upload a local file as a block blob, overwriting any existing blob.
    async fn upload_file(
        &self,
        container: &ContainerRef,
        blob: &str,
        path: &Path,
    ) -> Result<BlobRef, StorageError>;

    /// Enumerate every blob of the container in service order.
    async fn list_blobs(&self, container: &ContainerRef) -> Result<Vec<BlobRef>, StorageError>;

    /// Absolute URL of a blob, without any signature.
    fn blob_url(&self, container: &ContainerRef, blob: &str) -> String;

    /// Read-only shared access signature for one blob, as a query string
    /// starting with `?` that can be appended to `blob_url`.
    fn read_signature(
        &self,
        container: &ContainerRef,
        blob: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, StorageError>;

    /// Start an asynchronous server-side copy from `source_url` into `blob`.
    async fn start_copy(
        &self,
        container: &ContainerRef,
        blob: &str,
        source_url: &str,
    ) -> Result<CopyHandle, StorageError>;
}
