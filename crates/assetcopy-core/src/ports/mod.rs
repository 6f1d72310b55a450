//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（Blob storage, メディアサービス, 時刻, ID 生成）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod blob_store;
pub mod clock;
pub mod id_generator;
pub mod media_service;

// 主要な trait を再エクスポート
pub use self::blob_store::{BlobStore, StorageError};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{NameGenerator, UlidNameGenerator};
pub use self::media_service::{MediaError, MediaService};
