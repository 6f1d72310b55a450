//! PipelineBuilder - ports のワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;

use super::context::{MigrationContext, MigrationOptions};
use crate::ports::{BlobStore, Clock, MediaService, NameGenerator, SystemClock, UlidNameGenerator};

/// PipelineBuilder は MigrationContext を構築
///
/// # 使用例
/// ```ignore
/// let ctx = PipelineBuilder::new(options)
///     .source(Arc::new(external))
///     .destination(Arc::new(media_storage))
///     .media(Arc::new(media))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - source / destination / media の 3 つは必須
/// - clock と names は省略時に SystemClock / ULID を使う
/// - 不足があれば build() が BuildError を返す
pub struct PipelineBuilder {
    options: MigrationOptions,
    source: Option<Arc<dyn BlobStore>>,
    destination: Option<Arc<dyn BlobStore>>,
    media: Option<Arc<dyn MediaService>>,
    clock: Option<Arc<dyn Clock>>,
    names: Option<Arc<dyn NameGenerator>>,
}

/// BuildError はコンテキスト構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These must be set before build().")]
    MissingPorts(Vec<&'static str>),
}

impl PipelineBuilder {
    pub fn new(options: MigrationOptions) -> Self {
        Self {
            options,
            source: None,
            destination: None,
            media: None,
            clock: None,
            names: None,
        }
    }

    /// 外部ストレージ（アップロード先・コピー元）
    pub fn source(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.source = Some(store);
        self
    }

    /// メディアサービス側のストレージ（コピー先）
    pub fn destination(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.destination = Some(store);
        self
    }

    pub fn media(mut self, media: Arc<dyn MediaService>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn names(mut self, names: Arc<dyn NameGenerator>) -> Self {
        self.names = Some(names);
        self
    }

    /// # 検証
    /// - 必須 port が全て設定されているかチェック
    /// - 不足があれば BuildError::MissingPorts に全部まとめて返す
    pub fn build(self) -> Result<MigrationContext, BuildError> {
        let mut missing = Vec::new();
        if self.source.is_none() {
            missing.push("source");
        }
        if self.destination.is_none() {
            missing.push("destination");
        }
        if self.media.is_none() {
            missing.push("media");
        }

        match (self.source, self.destination, self.media) {
            (Some(source), Some(destination), Some(media)) => {
                let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
                let names = self
                    .names
                    .unwrap_or_else(|| Arc::new(UlidNameGenerator::new(SystemClock)));
                Ok(MigrationContext {
                    source,
                    destination,
                    media,
                    clock,
                    names,
                    options: self.options,
                })
            }
            _ => Err(BuildError::MissingPorts(missing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryBlobStore, InMemoryMediaService};

    fn options() -> MigrationOptions {
        MigrationOptions {
            local_media_dir: "/tmp/media".into(),
            source_container: "streamingfiles".into(),
            asset_name_prefix: "Burrito_".into(),
            manifest_extension: ".ism".into(),
        }
    }

    #[test]
    fn test_build_success() {
        let ctx = PipelineBuilder::new(options())
            .source(Arc::new(InMemoryBlobStore::new("external")))
            .destination(Arc::new(InMemoryBlobStore::new("mediastore")))
            .media(Arc::new(InMemoryMediaService::new("memory://mediastore", "https://origin")))
            .build()
            .unwrap();
        assert_eq!(ctx.source.account(), "external");
        assert!(ctx.names.unique_name("Burrito_").starts_with("Burrito_"));
    }

    #[test]
    fn test_build_missing_ports() {
        let result = PipelineBuilder::new(options())
            .source(Arc::new(InMemoryBlobStore::new("external")))
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingPorts(missing)) if missing == vec!["destination", "media"]
        ));
    }
}
