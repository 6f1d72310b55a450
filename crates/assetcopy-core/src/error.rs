use thiserror::Error;

use crate::domain::ErrorKind;
use crate::ports::{MediaError, StorageError};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("asset {asset} should have exactly one {extension} file, found {found}")]
    ManifestCount {
        asset: String,
        extension: String,
        found: usize,
    },

    #[error("asset {asset} has no {extension} file")]
    ManifestMissing { asset: String, extension: String },

    #[error("locator {locator} has no container in its path: {path}")]
    LocatorPath { locator: String, path: String },

    /// The copy service refused to start one copy. Only that blob is affected.
    #[error("copy of {blob} could not be started: {source}")]
    CopyStart {
        blob: String,
        #[source]
        source: StorageError,
    },
}

impl MigrateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrateError::Config(_)
            | MigrateError::ManifestCount { .. }
            | MigrateError::ManifestMissing { .. } => ErrorKind::Configuration,
            MigrateError::CopyStart { .. } => ErrorKind::Transient,
            MigrateError::Storage(_)
            | MigrateError::Media(_)
            | MigrateError::Io(_)
            | MigrateError::LocatorPath { .. } => ErrorKind::Infrastructure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_count_is_a_configuration_error() {
        let err = MigrateError::ManifestCount {
            asset: "Burrito_x".into(),
            extension: ".ism".into(),
            found: 2,
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("exactly one .ism file, found 2"));
    }

    #[test]
    fn storage_errors_are_infrastructure() {
        let err: MigrateError = StorageError::NotFound("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert!(err.kind().is_fatal());
    }

    #[test]
    fn copy_start_failure_is_transient() {
        let err = MigrateError::CopyStart {
            blob: "video.ismv".into(),
            source: StorageError::Status {
                operation: "copy",
                status: 409,
                body: "pending copy".into(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(!err.kind().is_fatal());
        assert!(err.to_string().starts_with("copy of video.ismv could not be started"));
    }
}
