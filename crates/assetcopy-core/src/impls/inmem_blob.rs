//! InMemoryBlobStore - 開発・テスト用の BlobStore
//!
//! # 学習ポイント
//! - `Arc<Mutex<_>>` による状態共有（clone したハンドルは同じ状態を見る）
//! - 失敗注入（特定 blob のコピー開始を失敗させる）
//! - 呼び出し記録（コピー開始が何回呼ばれたかをテストで検証する）

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{BlobRef, ContainerRef, CopyHandle, CopyStatus, PublicAccess};
use crate::ports::{BlobStore, StorageError};

const SCHEME: &str = "memory://";

/// One recorded `start_copy` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    pub container: String,
    pub blob: String,
    pub source_url: String,
}

#[derive(Debug, Default)]
struct ContainerState {
    public_access: Option<PublicAccess>,
    blobs: BTreeMap<String, Vec<u8>>,
}

#[derive(Default)]
struct StoreState {
    containers: HashMap<String, ContainerState>,
    copy_calls: Vec<CopyCall>,
    failing_copies: HashSet<String>,
    /// Other stores that `start_copy` may read from, keyed by account name.
    sources: HashMap<String, Arc<Mutex<StoreState>>>,
}

/// InMemoryBlobStore は 1 アカウント分のコンテナと blob をメモリに保持
///
/// # URL 形式
/// `memory://{account}/{container}/{blob}`。`link_source` で登録した別ストアの
/// URL を `start_copy` に渡すと内容がコピーされます。
#[derive(Clone)]
pub struct InMemoryBlobStore {
    account: String,
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBlobStore {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allow copies whose source URL points at `other`.
    pub fn link_source(&self, other: &InMemoryBlobStore) {
        self.state()
            .sources
            .insert(other.account.clone(), other.state.clone());
    }

    /// Make every subsequent `start_copy` into `blob` fail.
    pub fn fail_copy_of(&self, blob: impl Into<String>) {
        self.state().failing_copies.insert(blob.into());
    }

    /// Seed a blob directly, creating the container if needed.
    pub fn put_blob(&self, container: &str, blob: &str, data: impl Into<Vec<u8>>) {
        self.state()
            .containers
            .entry(container.to_string())
            .or_default()
            .blobs
            .insert(blob.to_string(), data.into());
    }

    pub fn blob(&self, container: &str, blob: &str) -> Option<Vec<u8>> {
        self.state()
            .containers
            .get(container)
            .and_then(|c| c.blobs.get(blob).cloned())
    }

    pub fn blob_names(&self, container: &str) -> Vec<String> {
        self.state()
            .containers
            .get(container)
            .map(|c| c.blobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state().containers.contains_key(container)
    }

    pub fn public_access(&self, container: &str) -> Option<PublicAccess> {
        self.state()
            .containers
            .get(container)
            .and_then(|c| c.public_access)
    }

    pub fn copy_calls(&self) -> Vec<CopyCall> {
        self.state().copy_calls.clone()
    }

    fn parse_url(url: &str) -> Option<(&str, &str, &str)> {
        let rest = url.strip_prefix(SCHEME)?;
        let rest = rest.split('?').next()?;
        let mut parts = rest.splitn(3, '/');
        Some((parts.next()?, parts.next()?, parts.next()?))
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn account(&self) -> &str {
        &self.account
    }

    async fn create_container_if_not_exists(
        &self,
        container: &ContainerRef,
    ) -> Result<bool, StorageError> {
        let mut state = self.state();
        if state.containers.contains_key(container.name()) {
            return Ok(false);
        }
        state
            .containers
            .insert(container.name().to_string(), ContainerState::default());
        Ok(true)
    }

    async fn set_public_access(
        &self,
        container: &ContainerRef,
        access: PublicAccess,
    ) -> Result<(), StorageError> {
        let mut state = self.state();
        let entry = state
            .containers
            .get_mut(container.name())
            .ok_or_else(|| StorageError::NotFound(format!("container {container}")))?;
        entry.public_access = Some(access);
        Ok(())
    }

    async fn exists(&self, container: &ContainerRef, blob: &str) -> Result<bool, StorageError> {
        Ok(self
            .state()
            .containers
            .get(container.name())
            .is_some_and(|c| c.blobs.contains_key(blob)))
    }

    async fn upload_file(
        &self,
        container: &ContainerRef,
        blob: &str,
        path: &Path,
    ) -> Result<BlobRef, StorageError> {
        let data = tokio::fs::read(path).await?;
        let size = data.len() as u64;

        let mut state = self.state();
        let entry = state
            .containers
            .get_mut(container.name())
            .ok_or_else(|| StorageError::NotFound(format!("container {container}")))?;
        entry.blobs.insert(blob.to_string(), data);

        Ok(BlobRef::new(container.clone(), blob, size))
    }

    async fn list_blobs(&self, container: &ContainerRef) -> Result<Vec<BlobRef>, StorageError> {
        let state = self.state();
        let entry = state
            .containers
            .get(container.name())
            .ok_or_else(|| StorageError::NotFound(format!("container {container}")))?;
        Ok(entry
            .blobs
            .iter()
            .map(|(name, data)| BlobRef::new(container.clone(), name, data.len() as u64))
            .collect())
    }

    fn blob_url(&self, container: &ContainerRef, blob: &str) -> String {
        format!("{SCHEME}{}/{}/{}", self.account, container, blob)
    }

    fn read_signature(
        &self,
        _container: &ContainerRef,
        _blob: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        Ok(format!("?sp=r&se={}&sig=memory", expires_at.timestamp()))
    }

    async fn start_copy(
        &self,
        container: &ContainerRef,
        blob: &str,
        source_url: &str,
    ) -> Result<CopyHandle, StorageError> {
        let mut state = self.state();
        state.copy_calls.push(CopyCall {
            container: container.name().to_string(),
            blob: blob.to_string(),
            source_url: source_url.to_string(),
        });

        if state.failing_copies.contains(blob) {
            return Err(StorageError::Status {
                operation: "copy",
                status: 500,
                body: format!("injected copy failure for {blob}"),
            });
        }

        let data = match Self::parse_url(source_url) {
            Some((account, src_container, src_blob)) if account == self.account => state
                .containers
                .get(src_container)
                .and_then(|c| c.blobs.get(src_blob).cloned()),
            Some((account, src_container, src_blob)) => {
                state.sources.get(account).and_then(|source| {
                    source
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .containers
                        .get(src_container)
                        .and_then(|c| c.blobs.get(src_blob).cloned())
                })
            }
            None => None,
        }
        .ok_or_else(|| StorageError::NotFound(format!("copy source {source_url}")))?;

        let entry = state
            .containers
            .get_mut(container.name())
            .ok_or_else(|| StorageError::NotFound(format!("container {container}")))?;
        entry.blobs.insert(blob.to_string(), data);

        Ok(CopyHandle {
            copy_id: None,
            status: CopyStatus::Success,
        })
    }
}
