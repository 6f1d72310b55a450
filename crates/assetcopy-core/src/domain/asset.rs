//! Assets and their file records.

use serde::{Deserialize, Serialize};

use super::ids::{AssetFileId, AssetId};

/// A named logical container of media files managed by the media service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    /// Backing storage URI reported by the service, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Metadata record linking a stored blob to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    pub id: AssetFileId,
    pub asset_id: AssetId,
    pub name: String,
    pub content_file_size: u64,
    pub is_primary: bool,
}

impl AssetFile {
    /// Case-insensitive suffix match on the file name.
    pub fn has_extension(&self, extension: &str) -> bool {
        ends_with_ignore_case(&self.name, extension)
    }
}

pub(crate) fn ends_with_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn file(name: &str) -> AssetFile {
        AssetFile {
            id: AssetFileId::new("nb:cid:UUID:f"),
            asset_id: AssetId::new("nb:cid:UUID:a"),
            name: name.to_string(),
            content_file_size: 0,
            is_primary: false,
        }
    }

    #[rstest]
    #[case("content.ism", true)]
    #[case("CONTENT.ISM", true)]
    #[case("content.Ism", true)]
    #[case("content.ismc", false)]
    #[case("content.ism.bak", false)]
    #[case("ism", false)]
    #[case("", false)]
    fn extension_match_is_case_insensitive(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(file(name).has_extension(".ism"), expected);
    }

    #[test]
    fn multibyte_names_do_not_panic() {
        assert!(!file("ビデオ").has_extension(".ism"));
        assert!(file("ビデオ.ism").has_extension(".ism"));
    }
}
