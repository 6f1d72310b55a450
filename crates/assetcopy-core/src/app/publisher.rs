//! Locator publisher - ストリーミング用ロケーターを発行し URL を組み立てる

use chrono::Duration;
use tracing::info;

use crate::domain::{AccessPermissions, AssetId, Locator, LocatorRequest, LocatorType};
use crate::error::MigrateError;
use crate::ports::{Clock, MediaService};

pub const STREAMING_POLICY_NAME: &str = "Streaming policy";
pub const STREAMING_POLICY_DAYS: i64 = 30;
/// Origin locators start slightly in the past to absorb clock skew.
pub const STREAMING_START_BACKDATE_MINUTES: i64 = 5;

/// Published streaming endpoint for one asset.
#[derive(Debug, Clone)]
pub struct Publication {
    pub locator: Locator,
    pub manifest_name: String,
    pub url: String,
}

/// `locator_path + file_name + "/manifest"`; the path already ends with `/`.
pub fn streaming_url(locator_path: &str, file_name: &str) -> String {
    format!("{locator_path}{file_name}/manifest")
}

/// Create a 30-day read policy and an origin locator, and return the manifest URL.
///
/// Uses the first file matching `extension`; primary selection has already
/// enforced that there is exactly one.
pub async fn publish(
    media: &dyn MediaService,
    clock: &dyn Clock,
    asset: &AssetId,
    extension: &str,
) -> Result<Publication, MigrateError> {
    let manifest = media
        .list_asset_files(asset)
        .await?
        .into_iter()
        .find(|f| f.has_extension(extension))
        .ok_or_else(|| MigrateError::ManifestMissing {
            asset: asset.to_string(),
            extension: extension.to_string(),
        })?;

    let policy = media
        .create_access_policy(
            STREAMING_POLICY_NAME,
            Duration::days(STREAMING_POLICY_DAYS),
            AccessPermissions::Read,
        )
        .await?;
    let locator = media
        .create_locator(LocatorRequest {
            locator_type: LocatorType::OnDemandOrigin,
            asset_id: asset.clone(),
            access_policy_id: policy.id,
            start_time: Some(clock.now() - Duration::minutes(STREAMING_START_BACKDATE_MINUTES)),
        })
        .await?;

    let url = streaming_url(&locator.path, &manifest.name);
    info!(asset = %asset, locator = %locator.id, url = %url, "streaming locator created");
    Ok(Publication {
        locator,
        manifest_name: manifest.name,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryMediaService;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn url_appends_file_and_manifest_suffix() {
        assert_eq!(
            streaming_url("https://example/locatorid/", "content.ism"),
            "https://example/locatorid/content.ism/manifest"
        );
    }

    #[tokio::test]
    async fn publish_creates_backdated_origin_locator() {
        let media = InMemoryMediaService::new("memory://store", "https://origin.example");
        let asset = media.create_asset("Burrito_x").await.unwrap();
        media.create_asset_file(&asset.id, "video.ismv").await.unwrap();
        media.create_asset_file(&asset.id, "content.ism").await.unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        let publication = publish(&media, &FixedClock::new(now), &asset.id, ".ism")
            .await
            .unwrap();

        assert!(publication.url.starts_with("https://origin.example/"));
        assert!(publication.url.ends_with("/content.ism/manifest"));
        assert_eq!(publication.locator.locator_type, LocatorType::OnDemandOrigin);
        assert_eq!(
            publication.locator.start_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 55, 0).unwrap())
        );
        let policies = media.live_policies();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].permissions, AccessPermissions::Read);
        assert_eq!(policies[0].duration_minutes, 30 * 24 * 60);
    }

    #[tokio::test]
    async fn asset_without_manifest_cannot_be_published() {
        let media = InMemoryMediaService::new("memory://store", "https://origin.example");
        let asset = media.create_asset("Burrito_x").await.unwrap();
        media.create_asset_file(&asset.id, "video.ismv").await.unwrap();

        let err = publish(&media, &FixedClock::new(Utc::now()), &asset.id, ".ism")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::ManifestMissing { .. }));
        assert!(media.live_locators().is_empty());
    }

    #[tokio::test]
    async fn first_matching_file_in_listing_order_is_published() {
        let media = InMemoryMediaService::new("memory://store", "https://origin.example");
        let asset = media.create_asset("Burrito_x").await.unwrap();
        media.create_asset_file(&asset.id, "first.ism").await.unwrap();
        media.create_asset_file(&asset.id, "video.ismv").await.unwrap();
        media.create_asset_file(&asset.id, "second.ISM").await.unwrap();

        let publication = publish(&media, &FixedClock::new(Utc::now()), &asset.id, ".ism")
            .await
            .unwrap();

        assert_eq!(publication.manifest_name, "first.ism");
        assert!(publication.url.ends_with("/first.ism/manifest"));
        assert_eq!(media.live_locators().len(), 1);
    }
}
