//! Domain identifiers (strongly-typed IDs).
//!
//! メディアサービスが払い出す ID（`nb:cid:UUID:...` など）は不透明な文字列です。
//! Phantom type パターンで `AssetId` と `LocatorId` などを型レベルで区別します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
///
/// エラーメッセージやログで使う種別名（"asset", "locator" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn kind() -> &'static str;
}

/// ジェネリック ID 型
///
/// 中身はサービス側の ID 文字列そのまま。`T` は実行時には使わないマーカー。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    raw: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Human-readable kind of the identified entity.
    pub fn kind(&self) -> &'static str {
        T::kind()
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Asset {}

impl IdMarker for Asset {
    fn kind() -> &'static str {
        "asset"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetFile {}

impl IdMarker for AssetFile {
    fn kind() -> &'static str {
        "asset file"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessPolicy {}

impl IdMarker for AccessPolicy {
    fn kind() -> &'static str {
        "access policy"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locator {}

impl IdMarker for Locator {
    fn kind() -> &'static str {
        "locator"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Identifier of an asset (the logical media container).
pub type AssetId = Id<Asset>;

/// Identifier of one file record inside an asset.
pub type AssetFileId = Id<AssetFile>;

/// Identifier of an access policy.
pub type AccessPolicyId = Id<AccessPolicy>;

/// Identifier of a locator.
pub type LocatorId = Id<Locator>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_raw_service_id() {
        let id = AssetId::new("nb:cid:UUID:1234");
        assert_eq!(id.to_string(), "nb:cid:UUID:1234");
        assert_eq!(id.kind(), "asset");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = LocatorId::new("nb:lid:UUID:abcd");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"nb:lid:UUID:abcd\"");

        let back: LocatorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn phantom_marker_does_not_change_layout() {
        use std::mem::size_of;
        assert_eq!(size_of::<AssetId>(), size_of::<String>());
        assert_eq!(size_of::<AccessPolicyId>(), size_of::<String>());
    }
}
