//! Blob storage references.
//!
//! The program never holds blob content itself; these are transient handles to
//! objects owned by the storage service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named container inside one storage account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerRef {
    name: String,
}

impl ContainerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A blob as reported by the storage service (listing or upload result).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub container: ContainerRef,
    pub name: String,
    /// Content length in bytes.
    pub size: u64,
}

impl BlobRef {
    pub fn new(container: ContainerRef, name: impl Into<String>, size: u64) -> Self {
        Self {
            container,
            name: name.into(),
            size,
        }
    }
}

/// Anonymous read access level of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicAccess {
    /// No anonymous access.
    Off,
    /// Anonymous read of individual blobs, no listing.
    Blob,
    /// Anonymous read of blobs and container listing.
    Container,
}

impl PublicAccess {
    /// Value of the `x-ms-blob-public-access` header, `None` when the header is omitted.
    pub fn header_value(self) -> Option<&'static str> {
        match self {
            PublicAccess::Off => None,
            PublicAccess::Blob => Some("blob"),
            PublicAccess::Container => Some("container"),
        }
    }
}

/// Server-side state of a copy right after it was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Pending,
    Success,
    Aborted,
    Failed,
}

impl CopyStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(CopyStatus::Pending),
            "success" => Some(CopyStatus::Success),
            "aborted" => Some(CopyStatus::Aborted),
            "failed" => Some(CopyStatus::Failed),
            _ => None,
        }
    }
}

/// Acknowledgement returned when a server-side copy was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyHandle {
    pub copy_id: Option<String>,
    pub status: CopyStatus,
}
