//! MediaService port - メディア資産管理サービス
//!
//! Asset / AssetFile / AccessPolicy / Locator の作成・更新・削除を提供します。
//!
//! # 実装
//! - **MediaServicesClient**: REST (OData v3) 実装（本番用）
//! - **InMemoryMediaService**: テスト用

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::domain::{
    AccessPermissions, AccessPolicy, AccessPolicyId, Asset, AssetFile, AssetId, Locator,
    LocatorId, LocatorRequest,
};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media service authentication failed: {0}")]
    Auth(String),

    #[error("media request failed during {operation}: {message}")]
    Request { operation: &'static str, message: String },

    #[error("media service {operation} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid media service response: {0}")]
    InvalidResponse(String),
}

/// MediaService はメディアサービスの API 面
///
/// # 設計原則
/// - 1 メソッド = 1 API 呼び出し
/// - AssetFile の更新は `update_asset_file` で明示的に永続化する
#[async_trait]
pub trait MediaService: Send + Sync {
    async fn create_asset(&self, name: &str) -> Result<Asset, MediaError>;

    /// Register a file record on the asset (size 0, not primary).
    async fn create_asset_file(&self, asset: &AssetId, name: &str)
    -> Result<AssetFile, MediaError>;

    /// Persist size and primary flag of a file record.
    async fn update_asset_file(&self, file: &AssetFile) -> Result<(), MediaError>;

    async fn list_asset_files(&self, asset: &AssetId) -> Result<Vec<AssetFile>, MediaError>;

    async fn create_access_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, MediaError>;

    async fn delete_access_policy(&self, id: &AccessPolicyId) -> Result<(), MediaError>;

    async fn create_locator(&self, request: LocatorRequest) -> Result<Locator, MediaError>;

    async fn delete_locator(&self, id: &LocatorId) -> Result<(), MediaError>;
}
