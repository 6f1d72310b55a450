//! assetcopy-core
//!
//! Building blocks for migrating a local directory of media files into a
//! streaming asset.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, blob, asset, access, outcome, errors）
//! - **ports**: 抽象化レイヤー（BlobStore, MediaService, Clock, NameGenerator）
//! - **app**: パイプライン（uploader, assembler, copy, primary, publisher, builder）
//! - **impls**: 実装（InMemory* と REST クライアント）
//! - **config**: 実行設定（環境変数 / JSON）
//! - **error**: crate 全体のエラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{MigrationContext, MigrationReport, PipelineBuilder, run_pipeline};
pub use config::Settings;
pub use error::MigrateError;
