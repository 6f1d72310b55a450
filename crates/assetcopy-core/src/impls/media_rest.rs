//! MediaServicesClient - メディアサービス REST (OData v3) 実装
//!
//! # 認証
//! ACS の OAuth2 client-credentials でアクセストークンを取得し、期限まで再利用します。
//!
//! # エンドポイント
//! 共通エンドポイントはアカウントごとのクラスタへ 301 でリダイレクトします。
//! POST/MERGE はリダイレクトで壊れるため、最初に GET で解決した URL を使い続けます。

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, StatusCode, redirect};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{AccountCredentials, MediaEndpoints};
use crate::domain::{
    AccessPermissions, AccessPolicy, AccessPolicyId, Asset, AssetFile, AssetFileId, AssetId,
    Locator, LocatorId, LocatorRequest, LocatorType,
};
use crate::ports::{MediaError, MediaService};

const API_VERSION: &str = "2.19";
const ODATA_JSON: &str = "application/json;odata=verbose";

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct MediaServicesClient {
    client: reqwest::Client,
    credentials: AccountCredentials,
    endpoints: MediaEndpoints,
    token: Mutex<Option<CachedToken>>,
    api_base: Mutex<Option<String>>,
}

impl MediaServicesClient {
    pub fn new(
        credentials: AccountCredentials,
        endpoints: MediaEndpoints,
    ) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(StdDuration::from_secs(120))
            .build()
            .map_err(|e| MediaError::Request {
                operation: "client init",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            credentials,
            endpoints,
            token: Mutex::new(None),
            api_base: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, MediaError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Utc::now()) {
            return Ok(token.value.clone());
        }

        debug!(account = %self.credentials.name, "requesting media service access token");
        let resp = self
            .client
            .post(&self.endpoints.acs)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.name.as_str()),
                ("client_secret", self.credentials.key.as_str()),
                ("scope", self.endpoints.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MediaError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(MediaError::Auth(format!("HTTP {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| MediaError::Auth(format!("token response: {e}")))?;
        let lifetime = token.expires_in_secs().unwrap_or(3600);
        let value = token.access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Utc::now() + Duration::seconds(lifetime - TOKEN_REFRESH_MARGIN_SECS),
        });
        Ok(value)
    }

    /// Resolve the account-specific API root once and cache it.
    async fn api_base(&self, token: &str) -> Result<String, MediaError> {
        let mut cached = self.api_base.lock().await;
        if let Some(base) = cached.as_ref() {
            return Ok(base.clone());
        }

        let resp = self
            .client
            .get(&self.endpoints.api)
            .bearer_auth(token)
            .header("x-ms-version", API_VERSION)
            .header("Accept", ODATA_JSON)
            .send()
            .await
            .map_err(|e| MediaError::Request {
                operation: "endpoint discovery",
                message: e.to_string(),
            })?;

        let base = match resp.status() {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::TEMPORARY_REDIRECT => {
                resp.headers()
                    .get("Location")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        MediaError::InvalidResponse("redirect without Location".into())
                    })?
            }
            s if s.is_success() => self.endpoints.api.clone(),
            _ => return Err(status_error("endpoint discovery", resp).await),
        };
        let base = if base.ends_with('/') {
            base
        } else {
            format!("{base}/")
        };

        info!(endpoint = %base, "resolved media service endpoint");
        *cached = Some(base.clone());
        Ok(base)
    }

    /// Send one OData request and return the `d` payload (`None` for empty bodies).
    async fn call(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, MediaError> {
        let token = self.access_token().await?;
        let base = self.api_base(&token).await?;

        let mut req = self
            .client
            .request(method, format!("{base}{path}"))
            .bearer_auth(&token)
            .header("x-ms-version", API_VERSION)
            .header("DataServiceVersion", "3.0")
            .header("MaxDataServiceVersion", "3.0")
            .header("Accept", ODATA_JSON);
        if let Some(body) = body {
            req = req
                .header("Content-Type", ODATA_JSON)
                .body(body.to_string());
        }

        let resp = req.send().await.map_err(|e| MediaError::Request {
            operation,
            message: e.to_string(),
        })?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(MediaError::NotFound {
                kind: operation,
                id: path.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(status_error(operation, resp).await);
        }

        let text = resp.text().await.map_err(|e| MediaError::Request {
            operation,
            message: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| MediaError::InvalidResponse(format!("{operation}: {e}")))?;
        let payload = match value {
            Value::Object(mut map) if map.contains_key("d") => {
                map.remove("d").unwrap_or_default()
            }
            other => other,
        };
        Ok(Some(payload))
    }

    async fn call_entity<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, MediaError> {
        let payload = self
            .call(operation, method, path, body)
            .await?
            .ok_or_else(|| MediaError::InvalidResponse(format!("{operation}: empty body")))?;
        serde_json::from_value(payload)
            .map_err(|e| MediaError::InvalidResponse(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl MediaService for MediaServicesClient {
    async fn create_asset(&self, name: &str) -> Result<Asset, MediaError> {
        let wire: WireAsset = self
            .call_entity(
                "create asset",
                Method::POST,
                "Assets",
                Some(json!({ "Name": name })),
            )
            .await?;
        Ok(wire.into())
    }

    async fn create_asset_file(
        &self,
        asset: &AssetId,
        name: &str,
    ) -> Result<AssetFile, MediaError> {
        let wire: WireFile = self
            .call_entity(
                "create asset file",
                Method::POST,
                "Files",
                Some(json!({
                    "IsEncrypted": "false",
                    "IsPrimary": "false",
                    "MimeType": "application/octet-stream",
                    "Name": name,
                    "ParentAssetId": asset.as_str(),
                })),
            )
            .await?;
        wire.into_domain()
    }

    async fn update_asset_file(&self, file: &AssetFile) -> Result<(), MediaError> {
        self.call(
            "update asset file",
            merge_method(),
            &entity_path("Files", file.id.as_str()),
            Some(json!({
                "ContentFileSize": file.content_file_size.to_string(),
                "IsPrimary": file.is_primary,
            })),
        )
        .await?;
        Ok(())
    }

    async fn list_asset_files(&self, asset: &AssetId) -> Result<Vec<AssetFile>, MediaError> {
        let page: WireResults<WireFile> = self
            .call_entity(
                "list asset files",
                Method::GET,
                &format!("{}/Files", entity_path("Assets", asset.as_str())),
                None,
            )
            .await?;
        page.results.into_iter().map(WireFile::into_domain).collect()
    }

    async fn create_access_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, MediaError> {
        let wire: WirePolicy = self
            .call_entity(
                "create access policy",
                Method::POST,
                "AccessPolicies",
                Some(json!({
                    "Name": name,
                    "DurationInMinutes": duration.num_minutes() as f64,
                    "Permissions": permissions.wire_value(),
                })),
            )
            .await?;
        Ok(wire.into_domain(permissions))
    }

    async fn delete_access_policy(&self, id: &AccessPolicyId) -> Result<(), MediaError> {
        self.call(
            "delete access policy",
            Method::DELETE,
            &entity_path("AccessPolicies", id.as_str()),
            None,
        )
        .await?;
        Ok(())
    }

    async fn create_locator(&self, request: LocatorRequest) -> Result<Locator, MediaError> {
        let mut body = json!({
            "AccessPolicyId": request.access_policy_id.as_str(),
            "AssetId": request.asset_id.as_str(),
            "Type": request.locator_type.wire_value(),
        });
        if let Some(start) = request.start_time {
            body["StartTime"] = Value::String(odata_datetime(start));
        }

        let wire: WireLocator = self
            .call_entity("create locator", Method::POST, "Locators", Some(body))
            .await?;
        Ok(Locator {
            id: LocatorId::new(wire.id),
            locator_type: wire
                .locator_type
                .and_then(LocatorType::from_wire)
                .unwrap_or(request.locator_type),
            path: wire.path,
            asset_id: request.asset_id,
            access_policy_id: request.access_policy_id,
            start_time: request.start_time,
        })
    }

    async fn delete_locator(&self, id: &LocatorId) -> Result<(), MediaError> {
        self.call(
            "delete locator",
            Method::DELETE,
            &entity_path("Locators", id.as_str()),
            None,
        )
        .await?;
        Ok(())
    }
}

async fn status_error(operation: &'static str, resp: reqwest::Response) -> MediaError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    MediaError::Status {
        operation,
        status,
        body,
    }
}

fn merge_method() -> Method {
    // OData partial update verb; the bytes are a valid token so this never falls back
    Method::from_bytes(b"MERGE").unwrap_or(Method::PATCH)
}

/// `Assets('nb%3Acid%3AUUID%3A...')`
fn entity_path(set: &str, id: &str) -> String {
    format!("{set}('{}')", utf8_percent_encode(id, NON_ALPHANUMERIC))
}

fn odata_datetime(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// OData verbose JSON renders Int64/Double either as strings or numbers.
fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.parse::<u64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as u64)),
        _ => None,
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Value,
}

impl TokenResponse {
    fn expires_in_secs(&self) -> Option<i64> {
        lenient_u64(&self.expires_in).map(|s| s as i64)
    }
}

#[derive(Deserialize)]
struct WireResults<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireAsset {
    id: String,
    name: String,
    #[serde(default)]
    uri: Option<String>,
}

impl From<WireAsset> for Asset {
    fn from(w: WireAsset) -> Self {
        Asset {
            id: AssetId::new(w.id),
            name: w.name,
            uri: w.uri,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireFile {
    id: String,
    name: String,
    parent_asset_id: String,
    #[serde(default)]
    content_file_size: Value,
    #[serde(default)]
    is_primary: bool,
}

impl WireFile {
    fn into_domain(self) -> Result<AssetFile, MediaError> {
        let content_file_size = match &self.content_file_size {
            Value::Null => 0,
            v => lenient_u64(v).ok_or_else(|| {
                MediaError::InvalidResponse(format!("bad ContentFileSize {v} on {}", self.name))
            })?,
        };
        Ok(AssetFile {
            id: AssetFileId::new(self.id),
            asset_id: AssetId::new(self.parent_asset_id),
            name: self.name,
            content_file_size,
            is_primary: self.is_primary,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePolicy {
    id: String,
    name: String,
    #[serde(default)]
    duration_in_minutes: Value,
}

impl WirePolicy {
    fn into_domain(self, permissions: AccessPermissions) -> AccessPolicy {
        AccessPolicy {
            id: AccessPolicyId::new(self.id),
            name: self.name,
            duration_minutes: lenient_u64(&self.duration_in_minutes).unwrap_or(0) as i64,
            permissions,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireLocator {
    id: String,
    path: String,
    #[serde(default, rename = "Type")]
    locator_type: Option<u32>,
}
