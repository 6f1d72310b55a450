//! Run configuration.
//!
//! Settings are read once at startup (environment or JSON file) and validated
//! for presence only. Nothing here talks to the network.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

pub const DEFAULT_SOURCE_CONTAINER: &str = "streamingfiles";
pub const DEFAULT_ASSET_PREFIX: &str = "Burrito_";
pub const DEFAULT_MANIFEST_EXTENSION: &str = ".ism";
pub const DEFAULT_MEDIA_API_ENDPOINT: &str = "https://media.windows.net/API/";
pub const DEFAULT_ACS_ENDPOINT: &str =
    "https://wamsprodglobal.accesscontrol.windows.net/v2/OAuth2-13";
pub const DEFAULT_ACS_SCOPE: &str = "urn:WindowsAzureMediaServices";

/// Name/key pair of one account.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountCredentials {
    pub name: String,
    pub key: String,
    #[serde(default = "default_true")]
    pub use_https: bool,
}

impl AccountCredentials {
    pub fn new(name: impl Into<String>, key: impl Into<String>, use_https: bool) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            use_https,
        }
    }
}

// keys stay out of logs
impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("name", &self.name)
            .field("key", &"<redacted>")
            .field("use_https", &self.use_https)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEndpoints {
    #[serde(default = "default_api_endpoint")]
    pub api: String,
    #[serde(default = "default_acs_endpoint")]
    pub acs: String,
    #[serde(default = "default_acs_scope")]
    pub scope: String,
}

impl Default for MediaEndpoints {
    fn default() -> Self {
        Self {
            api: default_api_endpoint(),
            acs: default_acs_endpoint(),
            scope: default_acs_scope(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Media service account (name + key used for the ACS token).
    pub media_services: AccountCredentials,
    /// Storage account attached to the media service (copy destination).
    pub media_storage: AccountCredentials,
    /// Independent storage account (upload target, copy source).
    pub external_storage: AccountCredentials,

    #[serde(default = "default_source_container")]
    pub source_container: String,
    #[serde(default)]
    pub local_media_dir: PathBuf,
    #[serde(default = "default_asset_prefix")]
    pub asset_name_prefix: String,
    #[serde(default = "default_manifest_extension")]
    pub manifest_extension: String,
    #[serde(default)]
    pub media_endpoints: MediaEndpoints,
}

impl Settings {
    /// Read settings from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, MigrateError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MigrateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| MigrateError::Config(format!("{key} is not set")))
        };
        let flag = |key: &str, default: bool| match lookup(key).as_deref() {
            Some("1") | Some("true") | Some("TRUE") | Some("True") => true,
            Some("0") | Some("false") | Some("FALSE") | Some("False") => false,
            _ => default,
        };

        let media_defaults = MediaEndpoints::default();
        Ok(Self {
            media_services: AccountCredentials::new(
                required("MEDIA_SERVICES_ACCOUNT_NAME")?,
                required("MEDIA_SERVICES_ACCOUNT_KEY")?,
                true,
            ),
            media_storage: AccountCredentials::new(
                required("MEDIA_SERVICES_STORAGE_ACCOUNT_NAME")?,
                required("MEDIA_SERVICES_STORAGE_ACCOUNT_KEY")?,
                flag("MEDIA_SERVICES_STORAGE_USE_HTTPS", false),
            ),
            external_storage: AccountCredentials::new(
                required("EXTERNAL_STORAGE_ACCOUNT_NAME")?,
                required("EXTERNAL_STORAGE_ACCOUNT_KEY")?,
                flag("EXTERNAL_STORAGE_USE_HTTPS", true),
            ),
            source_container: lookup("ASSETCOPY_SOURCE_CONTAINER")
                .unwrap_or_else(default_source_container),
            local_media_dir: lookup("ASSETCOPY_LOCAL_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_default(),
            asset_name_prefix: lookup("ASSETCOPY_ASSET_PREFIX").unwrap_or_else(default_asset_prefix),
            manifest_extension: lookup("ASSETCOPY_MANIFEST_EXTENSION")
                .unwrap_or_else(default_manifest_extension),
            media_endpoints: MediaEndpoints {
                api: lookup("MEDIA_SERVICES_API_ENDPOINT").unwrap_or(media_defaults.api),
                acs: lookup("MEDIA_SERVICES_ACS_ENDPOINT").unwrap_or(media_defaults.acs),
                scope: lookup("MEDIA_SERVICES_ACS_SCOPE").unwrap_or(media_defaults.scope),
            },
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, MigrateError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| MigrateError::Config(format!("{}: {e}", path.display())))
    }

    /// Presence check only; values are not checked against the services.
    pub fn validate(&self) -> Result<(), MigrateError> {
        let fields = [
            ("media_services.name", &self.media_services.name),
            ("media_services.key", &self.media_services.key),
            ("media_storage.name", &self.media_storage.name),
            ("media_storage.key", &self.media_storage.key),
            ("external_storage.name", &self.external_storage.name),
            ("external_storage.key", &self.external_storage.key),
            ("source_container", &self.source_container),
            ("manifest_extension", &self.manifest_extension),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(MigrateError::Config(format!("{field} is empty")));
            }
        }
        if self.local_media_dir.as_os_str().is_empty() {
            return Err(MigrateError::Config("local_media_dir is empty".into()));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_source_container() -> String {
    DEFAULT_SOURCE_CONTAINER.to_string()
}

fn default_asset_prefix() -> String {
    DEFAULT_ASSET_PREFIX.to_string()
}

fn default_manifest_extension() -> String {
    DEFAULT_MANIFEST_EXTENSION.to_string()
}

fn default_api_endpoint() -> String {
    DEFAULT_MEDIA_API_ENDPOINT.to_string()
}

fn default_acs_endpoint() -> String {
    DEFAULT_ACS_ENDPOINT.to_string()
}

fn default_acs_scope() -> String {
    DEFAULT_ACS_SCOPE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("MEDIA_SERVICES_ACCOUNT_NAME", "media"),
            ("MEDIA_SERVICES_ACCOUNT_KEY", "mediakey"),
            ("MEDIA_SERVICES_STORAGE_ACCOUNT_NAME", "mediastore"),
            ("MEDIA_SERVICES_STORAGE_ACCOUNT_KEY", "bWVkaWFzdG9yZWtleQ=="),
            ("EXTERNAL_STORAGE_ACCOUNT_NAME", "external"),
            ("EXTERNAL_STORAGE_ACCOUNT_KEY", "ZXh0ZXJuYWxrZXk="),
            ("ASSETCOPY_LOCAL_MEDIA_DIR", "/tmp/streamingfiles"),
        ])
    }

    #[test]
    fn lookup_fills_defaults() {
        let env = full_env();
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(settings.source_container, "streamingfiles");
        assert_eq!(settings.asset_name_prefix, "Burrito_");
        assert_eq!(settings.manifest_extension, ".ism");
        assert!(!settings.media_storage.use_https);
        assert!(settings.external_storage.use_https);
        assert_eq!(settings.media_endpoints.api, DEFAULT_MEDIA_API_ENDPOINT);
        settings.validate().unwrap();
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let mut env = full_env();
        env.remove("EXTERNAL_STORAGE_ACCOUNT_KEY");
        let err = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, MigrateError::Config(msg) if msg.contains("EXTERNAL_STORAGE_ACCOUNT_KEY")));
    }

    #[test]
    fn empty_value_fails_validation() {
        let mut env = full_env();
        env.insert("MEDIA_SERVICES_ACCOUNT_KEY", " ");
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "media_services": { "name": "media", "key": "k" },
                "media_storage": { "name": "mediastore", "key": "k", "use_https": false },
                "external_storage": { "name": "external", "key": "k" },
                "local_media_dir": "/data/streamingfiles"
            }"#,
        )
        .unwrap();

        let settings = Settings::from_json_file(&path).unwrap();
        assert_eq!(settings.external_storage.name, "external");
        assert!(settings.external_storage.use_https);
        assert!(!settings.media_storage.use_https);
        assert_eq!(settings.source_container, DEFAULT_SOURCE_CONTAINER);
        settings.validate().unwrap();
    }

    #[test]
    fn debug_output_redacts_keys() {
        let creds = AccountCredentials::new("acct", "secret", true);
        let out = format!("{creds:?}");
        assert!(!out.contains("secret"));
        assert!(out.contains("acct"));
    }
}
