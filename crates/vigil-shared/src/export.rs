//! User-facing progress export.
//!
//! The document is the full record with an `exportedAt` timestamp next to
//! it (plus the badge catalog version it was written with). Import ignores
//! any other top-level fields so documents written by newer versions still
//! load.

use crate::badges::BADGE_CATALOG_VERSION;
use crate::error::Result;
use crate::progress::UserProgress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressExport {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub badge_catalog_version: u32,
}

impl ProgressExport {
    pub fn new(progress: UserProgress, exported_at: DateTime<Utc>) -> Self {
        Self {
            progress,
            exported_at,
            badge_catalog_version: BADGE_CATALOG_VERSION,
        }
    }
}

/// Serialize a record as a pretty JSON export document
pub fn export_progress(progress: &UserProgress, at: DateTime<Utc>) -> Result<String> {
    let doc = ProgressExport::new(progress.clone(), at);
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse an export document back into a normalized record
pub fn import_progress(json: &str) -> Result<UserProgress> {
    let doc: ProgressExport = serde_json::from_str(json)?;
    Ok(doc.progress.normalized())
}
