//! Primary-file selection.

use tracing::info;

use crate::domain::{AssetFile, AssetId};
use crate::error::MigrateError;
use crate::ports::MediaService;

/// Mark the single file ending in `extension` (case-insensitive) as primary.
///
/// Zero or several matches is a configuration error; nothing is updated then.
pub async fn select_primary(
    media: &dyn MediaService,
    asset: &AssetId,
    extension: &str,
) -> Result<AssetFile, MigrateError> {
    let files = media.list_asset_files(asset).await?;
    let mut matches: Vec<AssetFile> = files
        .into_iter()
        .filter(|f| f.has_extension(extension))
        .collect();

    if matches.len() != 1 {
        return Err(MigrateError::ManifestCount {
            asset: asset.to_string(),
            extension: extension.to_string(),
            found: matches.len(),
        });
    }

    let mut manifest = matches.remove(0);
    manifest.is_primary = true;
    media.update_asset_file(&manifest).await?;
    info!(asset = %asset, file = %manifest.name, "marked primary file");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::InMemoryMediaService;
    use rstest::rstest;

    async fn asset_with(media: &InMemoryMediaService, names: &[&str]) -> AssetId {
        let asset = media.create_asset("Burrito_test").await.unwrap();
        for name in names {
            media.create_asset_file(&asset.id, name).await.unwrap();
        }
        asset.id
    }

    #[tokio::test]
    async fn single_manifest_becomes_primary() {
        let media = InMemoryMediaService::new("memory://store", "https://origin");
        let asset = asset_with(&media, &["video.ismv", "Content.ISM", "audio.isma"]).await;

        let primary = select_primary(&media, &asset, ".ism").await.unwrap();

        assert_eq!(primary.name, "Content.ISM");
        let stored = media.asset_files(&asset);
        assert!(stored.iter().any(|f| f.name == "Content.ISM" && f.is_primary));
        assert_eq!(stored.iter().filter(|f| f.is_primary).count(), 1);
    }

    #[rstest]
    #[case::none(&["video.ismv", "audio.isma"], 0)]
    #[case::two(&["a.ism", "b.ism", "video.ismv"], 2)]
    #[tokio::test]
    async fn wrong_manifest_count_is_fatal(#[case] names: &[&str], #[case] found: usize) {
        let media = InMemoryMediaService::new("memory://store", "https://origin");
        let asset = asset_with(&media, names).await;

        let err = select_primary(&media, &asset, ".ism").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, MigrateError::ManifestCount { found: f, .. } if f == found));
        assert!(media.asset_files(&asset).iter().all(|f| !f.is_primary));
    }
}
