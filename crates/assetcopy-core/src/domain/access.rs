//! Access policies and locators.
//!
//! A policy is a permission + duration template; a locator is one concrete,
//! time-scoped access path to an asset's backing container minted from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AccessPolicyId, AssetId, LocatorId};

/// Permissions granted by an access policy.
///
/// Wire values follow the media service's flag enum (Read = 1, Write = 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPermissions {
    Read,
    Write,
}

impl AccessPermissions {
    pub fn wire_value(self) -> u32 {
        match self {
            AccessPermissions::Read => 1,
            AccessPermissions::Write => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub id: AccessPolicyId,
    pub name: String,
    pub duration_minutes: i64,
    pub permissions: AccessPermissions,
}

/// Kind of locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorType {
    /// Write-capable shared access signature URL to the backing container.
    Sas,
    /// Read-only streaming origin path.
    OnDemandOrigin,
}

impl LocatorType {
    pub fn wire_value(self) -> u32 {
        match self {
            LocatorType::Sas => 1,
            LocatorType::OnDemandOrigin => 2,
        }
    }

    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            1 => Some(LocatorType::Sas),
            2 => Some(LocatorType::OnDemandOrigin),
            _ => None,
        }
    }
}

/// Parameters for minting a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorRequest {
    pub locator_type: LocatorType,
    pub asset_id: AssetId,
    pub access_policy_id: AccessPolicyId,
    /// `None` lets the service start the locator immediately.
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub id: LocatorId,
    pub locator_type: LocatorType,
    pub path: String,
    pub asset_id: AssetId,
    pub access_policy_id: AccessPolicyId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

impl Locator {
    /// First path segment of the locator URI.
    ///
    /// For a SAS locator this is the name of the asset's backing container,
    /// e.g. `https://acct.blob.core.windows.net/asset-1234?sv=...` -> `asset-1234`.
    pub fn container_name(&self) -> Option<&str> {
        first_path_segment(&self.path)
    }
}

pub(crate) fn first_path_segment(uri: &str) -> Option<&str> {
    let after_scheme = match uri.find("://") {
        Some(pos) => &uri[pos + 3..],
        None => uri,
    };
    let path = &after_scheme[after_scheme.find('/')? + 1..];
    let end = path.find(['/', '?', '#']).unwrap_or(path.len());
    let segment = &path[..end];
    if segment.is_empty() { None } else { Some(segment) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "https://acct.blob.core.windows.net/asset-6f1c?sv=2012-02-12&sig=abc",
        Some("asset-6f1c")
    )]
    #[case("http://acct.blob.core.windows.net/asset-6f1c/", Some("asset-6f1c"))]
    #[case("https://acct.blob.core.windows.net/asset-6f1c", Some("asset-6f1c"))]
    #[case("https://acct.blob.core.windows.net/", None)]
    #[case("https://acct.blob.core.windows.net", None)]
    fn container_name_is_first_segment(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(first_path_segment(path), expected);
    }

    #[test]
    fn locator_type_wire_values_round_trip() {
        for t in [LocatorType::Sas, LocatorType::OnDemandOrigin] {
            assert_eq!(LocatorType::from_wire(t.wire_value()), Some(t));
        }
        assert_eq!(LocatorType::from_wire(0), None);
    }

    #[test]
    fn permissions_wire_values() {
        assert_eq!(AccessPermissions::Read.wire_value(), 1);
        assert_eq!(AccessPermissions::Write.wire_value(), 2);
    }
}
