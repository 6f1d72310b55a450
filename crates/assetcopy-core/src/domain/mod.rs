//! Domain model (ids, blobs, assets, access policies, locators, outcomes).

pub mod access;
pub mod asset;
pub mod blob;
pub mod errors;
pub mod ids;
pub mod outcome;

pub use access::{AccessPermissions, AccessPolicy, Locator, LocatorRequest, LocatorType};
pub use asset::{Asset, AssetFile};
pub use blob::{BlobRef, ContainerRef, CopyHandle, CopyStatus, PublicAccess};
pub use errors::ErrorKind;
pub use ids::{AccessPolicyId, AssetFileId, AssetId, LocatorId};
pub use outcome::{CopyCounts, CopyRecord, CopyReport, OutcomeKind};
