//! Impls - ports の実装
//!
//! # 開発・テスト用
//! - **InMemoryBlobStore**: コピー呼び出しの記録と失敗注入
//! - **InMemoryMediaService**: ポリシー・ロケーターの生成と削除を記録
//!
//! # 本番用
//! - **AzureBlobStore**: Blob REST (Shared Key 認証, サービス SAS)
//! - **MediaServicesClient**: メディアサービス REST (ACS トークン, OData)

pub mod azure_blob;
pub mod inmem_blob;
pub mod inmem_media;
pub mod media_rest;

// 主要な型を再エクスポート
pub use self::azure_blob::AzureBlobStore;
pub use self::inmem_blob::{CopyCall, InMemoryBlobStore};
pub use self::inmem_media::{InMemoryMediaService, MediaCall};
pub use self::media_rest::MediaServicesClient;
