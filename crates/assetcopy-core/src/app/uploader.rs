//! Uploader - ローカルディレクトリ → 外部ストレージのコンテナ

use std::path::Path;

use tracing::{debug, info};

use crate::domain::{BlobRef, ContainerRef};
use crate::error::MigrateError;
use crate::ports::BlobStore;

/// Result of one directory upload.
#[derive(Debug, Clone)]
pub struct UploadedContainer {
    pub container: ContainerRef,
    pub blobs: Vec<BlobRef>,
}

/// Upload every regular file directly inside `dir` into `container_name`.
///
/// Subdirectories are ignored; symlinks are followed. Blobs are named after
/// the file and overwrite existing blobs of the same name. A file name that
/// is not valid UTF-8 fails the upload before anything is sent. The first
/// failure aborts.
pub async fn upload_directory(
    store: &dyn BlobStore,
    dir: &Path,
    container_name: &str,
) -> Result<UploadedContainer, MigrateError> {
    let container = ContainerRef::new(container_name);
    if store.create_container_if_not_exists(&container).await? {
        info!(container = %container, account = store.account(), "created upload container");
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // metadata follows symlinks, file_type does not
        if !tokio::fs::metadata(&path).await?.is_file() {
            debug!(path = %path.display(), "skipping non-file entry");
            continue;
        }
        let name = entry.file_name().into_string().map_err(|raw| {
            MigrateError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("file name {raw:?} is not valid UTF-8"),
            ))
        })?;
        files.push((name, path));
    }
    // read_dir order is platform dependent
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut blobs = Vec::with_capacity(files.len());
    for (name, path) in files {
        let blob = store.upload_file(&container, &name, &path).await?;
        info!(blob = %blob.name, size = blob.size, container = %container, "uploaded");
        blobs.push(blob);
    }

    Ok(UploadedContainer { container, blobs })
}
