//! Outcome model: per-blob result of the copy loop.
//!
//! The copy loop never aborts on a single failed copy; instead every blob gets
//! a `CopyRecord` and the assembler returns the whole `CopyReport` so callers
//! (and tests) can inspect what happened without scraping log output.

use serde::{Deserialize, Serialize};

/// Classification of one copy attempt.
///
/// Serialized as SCREAMING_SNAKE_CASE: COPIED / SKIPPED / FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    /// Server-side copy was accepted (not necessarily finished).
    Copied,
    /// A blob with the same name already existed at the destination.
    Skipped,
    /// Starting the copy failed; the loop continued.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRecord {
    pub blob: String,
    pub kind: OutcomeKind,

    /// Size recorded on the asset file (taken from the source blob).
    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CopyRecord {
    pub fn copied(blob: impl Into<String>, size: u64) -> Self {
        Self {
            blob: blob.into(),
            kind: OutcomeKind::Copied,
            size,
            reason: None,
        }
    }

    pub fn skipped(blob: impl Into<String>, size: u64) -> Self {
        Self {
            blob: blob.into(),
            kind: OutcomeKind::Skipped,
            size,
            reason: None,
        }
    }

    pub fn failed(blob: impl Into<String>, size: u64, reason: impl Into<String>) -> Self {
        Self {
            blob: blob.into(),
            kind: OutcomeKind::Failed,
            size,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyCounts {
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Ordered list of copy records, one per source blob, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    pub records: Vec<CopyRecord>,
}

impl CopyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: CopyRecord) {
        self.records.push(record);
    }

    pub fn counts(&self) -> CopyCounts {
        let mut counts = CopyCounts::default();
        for record in &self.records {
            match record.kind {
                OutcomeKind::Copied => counts.copied += 1,
                OutcomeKind::Skipped => counts.skipped += 1,
                OutcomeKind::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn get(&self, blob: &str) -> Option<&CopyRecord> {
        self.records.iter().find(|r| r.blob == blob)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CopyRecord> {
        self.records
            .iter()
            .filter(|r| r.kind == OutcomeKind::Failed)
    }
}
