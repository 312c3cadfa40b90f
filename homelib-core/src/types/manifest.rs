//! Parsed archive contents

use super::CatalogRecord;
use crate::error::RecordError;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

/// Everything an archive manifest describes
#[derive(Debug, Clone, Default)]
pub struct ArchiveManifest {
    /// When the archive was written, if recorded
    pub export_date: Option<NaiveDateTime>,

    /// Format tag; absent for legacy archives
    pub version: Option<String>,

    /// Records that parsed, in archive order
    pub records: Vec<CatalogRecord>,

    /// Book entries that could not be turned into records
    pub rejected: Vec<RecordError>,

    /// Asset filenames referenced by at least one record
    pub assets: BTreeSet<String>,
}

impl ArchiveManifest {
    /// Format tag written by this version
    pub const FORMAT_VERSION: &'static str = "2.0";

    /// Number of book entries found, parsed or not
    pub fn entry_count(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}
