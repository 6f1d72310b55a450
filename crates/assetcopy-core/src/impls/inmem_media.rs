//! InMemoryMediaService - テスト用のメディアサービス
//!
//! 作成・削除されたポリシーとロケーターを記録し、呼び出し順序も残します。
//! パイプラインの順序保証（書き込みロケーター削除がコピー後、など）を
//! テストで検証するために使います。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{
    AccessPermissions, AccessPolicy, AccessPolicyId, Asset, AssetFile, AssetFileId, AssetId,
    Locator, LocatorId, LocatorRequest, LocatorType,
};
use crate::ports::{MediaError, MediaService};

/// One recorded API call, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    CreateAsset(String),
    CreateAssetFile(String),
    UpdateAssetFile(String),
    ListAssetFiles,
    CreateAccessPolicy(AccessPermissions),
    DeleteAccessPolicy(AccessPolicyId),
    CreateLocator(LocatorType),
    DeleteLocator(LocatorId),
}

#[derive(Default)]
struct MediaState {
    next_id: u64,
    assets: HashMap<AssetId, Asset>,
    files: Vec<AssetFile>,
    policies: HashMap<AccessPolicyId, AccessPolicy>,
    locators: HashMap<LocatorId, Locator>,
    calls: Vec<MediaCall>,
    failing_registrations: HashSet<String>,
}

impl MediaState {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone)]
pub struct InMemoryMediaService {
    storage_base: String,
    origin_base: String,
    state: Arc<Mutex<MediaState>>,
}

impl InMemoryMediaService {
    /// `storage_base` prefixes SAS locator paths, `origin_base` prefixes
    /// streaming locator paths.
    pub fn new(storage_base: impl Into<String>, origin_base: impl Into<String>) -> Self {
        Self {
            storage_base: storage_base.into(),
            origin_base: origin_base.into(),
            state: Arc::new(Mutex::new(MediaState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MediaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `create_asset_file` fail for this file name.
    pub fn fail_registration_of(&self, name: impl Into<String>) {
        self.state().failing_registrations.insert(name.into());
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        self.state().calls.clone()
    }

    pub fn asset_files(&self, asset: &AssetId) -> Vec<AssetFile> {
        self.state()
            .files
            .iter()
            .filter(|f| &f.asset_id == asset)
            .cloned()
            .collect()
    }

    /// Policies that were created and not deleted.
    pub fn live_policies(&self) -> Vec<AccessPolicy> {
        self.state().policies.values().cloned().collect()
    }

    /// Locators that were created and not deleted.
    pub fn live_locators(&self) -> Vec<Locator> {
        self.state().locators.values().cloned().collect()
    }

    fn not_found<T: crate::domain::ids::IdMarker>(id: &crate::domain::ids::Id<T>) -> MediaError {
        MediaError::NotFound {
            kind: id.kind(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl MediaService for InMemoryMediaService {
    async fn create_asset(&self, name: &str) -> Result<Asset, MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::CreateAsset(name.to_string()));
        let n = state.next();
        let asset = Asset {
            id: AssetId::new(format!("nb:cid:UUID:{n:08}")),
            name: name.to_string(),
            uri: None,
        };
        state.assets.insert(asset.id.clone(), asset.clone());
        Ok(asset)
    }

    async fn create_asset_file(
        &self,
        asset: &AssetId,
        name: &str,
    ) -> Result<AssetFile, MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::CreateAssetFile(name.to_string()));
        if !state.assets.contains_key(asset) {
            return Err(Self::not_found(asset));
        }
        if state.failing_registrations.contains(name) {
            return Err(MediaError::Status {
                operation: "create asset file",
                status: 400,
                body: format!("injected registration failure for {name}"),
            });
        }
        let n = state.next();
        let file = AssetFile {
            id: AssetFileId::new(format!("nb:cid:UUID:{n:08}")),
            asset_id: asset.clone(),
            name: name.to_string(),
            content_file_size: 0,
            is_primary: false,
        };
        state.files.push(file.clone());
        Ok(file)
    }

    async fn update_asset_file(&self, file: &AssetFile) -> Result<(), MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::UpdateAssetFile(file.name.clone()));
        let stored = state
            .files
            .iter_mut()
            .find(|f| f.id == file.id)
            .ok_or_else(|| Self::not_found(&file.id))?;
        stored.content_file_size = file.content_file_size;
        stored.is_primary = file.is_primary;
        Ok(())
    }

    async fn list_asset_files(&self, asset: &AssetId) -> Result<Vec<AssetFile>, MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::ListAssetFiles);
        Ok(state
            .files
            .iter()
            .filter(|f| &f.asset_id == asset)
            .cloned()
            .collect())
    }

    async fn create_access_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::CreateAccessPolicy(permissions));
        let n = state.next();
        let policy = AccessPolicy {
            id: AccessPolicyId::new(format!("nb:pid:UUID:{n:08}")),
            name: name.to_string(),
            duration_minutes: duration.num_minutes(),
            permissions,
        };
        state.policies.insert(policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn delete_access_policy(&self, id: &AccessPolicyId) -> Result<(), MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::DeleteAccessPolicy(id.clone()));
        if state.locators.values().any(|l| &l.access_policy_id == id) {
            return Err(MediaError::Status {
                operation: "delete access policy",
                status: 400,
                body: format!("policy {id} is still referenced by a locator"),
            });
        }
        state
            .policies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create_locator(&self, request: LocatorRequest) -> Result<Locator, MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::CreateLocator(request.locator_type));
        if !state.assets.contains_key(&request.asset_id) {
            return Err(Self::not_found(&request.asset_id));
        }
        if !state.policies.contains_key(&request.access_policy_id) {
            return Err(Self::not_found(&request.access_policy_id));
        }
        let n = state.next();
        let path = match request.locator_type {
            LocatorType::Sas => format!("{}/asset-{n:08}?sv=memory&sig=write", self.storage_base),
            LocatorType::OnDemandOrigin => format!("{}/{n:08}/", self.origin_base),
        };
        let locator = Locator {
            id: LocatorId::new(format!("nb:lid:UUID:{n:08}")),
            locator_type: request.locator_type,
            path,
            asset_id: request.asset_id,
            access_policy_id: request.access_policy_id,
            start_time: request.start_time,
        };
        state.locators.insert(locator.id.clone(), locator.clone());
        Ok(locator)
    }

    async fn delete_locator(&self, id: &LocatorId) -> Result<(), MediaError> {
        let mut state = self.state();
        state.calls.push(MediaCall::DeleteLocator(id.clone()));
        state
            .locators
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn policy_cannot_be_deleted_before_its_locator() {
        let media = InMemoryMediaService::new("memory://store", "https://origin");
        let asset = media.create_asset("Burrito_1").await.unwrap();
        let policy = media
            .create_access_policy("writePolicy", Duration::hours(24), AccessPermissions::Write)
            .await
            .unwrap();
        let locator = media
            .create_locator(LocatorRequest {
                locator_type: LocatorType::Sas,
                asset_id: asset.id.clone(),
                access_policy_id: policy.id.clone(),
                start_time: None,
            })
            .await
            .unwrap();

        assert!(media.delete_access_policy(&policy.id).await.is_err());
        media.delete_locator(&locator.id).await.unwrap();
        media.delete_access_policy(&policy.id).await.unwrap();
        assert!(media.live_policies().is_empty());
        assert!(media.live_locators().is_empty());
    }

    #[tokio::test]
    async fn sas_locator_path_names_a_container() {
        let media = InMemoryMediaService::new("memory://mediastore", "https://origin");
        let asset = media.create_asset("Burrito_1").await.unwrap();
        let policy = media
            .create_access_policy("writePolicy", Duration::hours(24), AccessPermissions::Write)
            .await
            .unwrap();
        let locator = media
            .create_locator(LocatorRequest {
                locator_type: LocatorType::Sas,
                asset_id: asset.id,
                access_policy_id: policy.id,
                start_time: None,
            })
            .await
            .unwrap();

        assert!(locator.container_name().unwrap().starts_with("asset-"));
    }
}
