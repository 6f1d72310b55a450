//! MigrationContext - 1 回の実行に必要な ports と設定値
//!
//! 起動時に一度だけ組み立て、以降は読み取り専用で各ステージに渡します。

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::ports::{BlobStore, Clock, MediaService, NameGenerator};

/// Plain values each stage reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    pub local_media_dir: PathBuf,
    pub source_container: String,
    pub asset_name_prefix: String,
    pub manifest_extension: String,
}

impl From<&Settings> for MigrationOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            local_media_dir: settings.local_media_dir.clone(),
            source_container: settings.source_container.clone(),
            asset_name_prefix: settings.asset_name_prefix.clone(),
            manifest_extension: settings.manifest_extension.clone(),
        }
    }
}

pub struct MigrationContext {
    /// External storage account: upload target and copy source.
    pub source: Arc<dyn BlobStore>,
    /// Storage account backing the media service: copy destination.
    pub destination: Arc<dyn BlobStore>,
    pub media: Arc<dyn MediaService>,
    pub clock: Arc<dyn Clock>,
    pub names: Arc<dyn NameGenerator>,
    pub options: MigrationOptions,
}
