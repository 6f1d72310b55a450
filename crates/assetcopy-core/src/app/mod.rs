//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて移行パイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **PipelineBuilder**: ports のワイヤリング（MigrationContext を構築）
//! - **upload_directory**: ローカル → 外部ストレージ
//! - **assemble_asset**: 外部ストレージ → アセット（コピーループ）
//! - **copy_blob**: 1 blob 分のコピー判定
//! - **select_primary**: マニフェストをプライマリに設定
//! - **publish**: ストリーミングロケーターと URL
//! - **run_pipeline**: 上記を順番に実行

pub mod assembler;
pub mod builder;
pub mod context;
pub mod copy;
pub mod pipeline;
pub mod primary;
pub mod publisher;
pub mod uploader;

// 主要な型を再エクスポート
pub use self::assembler::{AssembledAsset, assemble_asset};
pub use self::builder::{BuildError, PipelineBuilder};
pub use self::context::{MigrationContext, MigrationOptions};
pub use self::copy::copy_blob;
pub use self::pipeline::{MigrationReport, run_pipeline};
pub use self::primary::select_primary;
pub use self::publisher::{Publication, publish, streaming_url};
pub use self::uploader::{UploadedContainer, upload_directory};
