//! Archive packaging

use super::manifest::encode_manifest;
use super::{asset_reference, ASSETS_DIR, MANIFEST_ENTRY};
use crate::error::Result;
use crate::types::{now_seconds, CatalogRecord};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What ended up inside a written archive
#[derive(Debug, Clone)]
pub struct WrittenArchive {
    /// Final archive location (may differ from the requested one, see [`packaged_path`])
    pub path: PathBuf,

    pub records: usize,

    /// Asset entries stored
    pub assets: usize,

    /// Assets that vanished before they could be packaged
    pub dropped_assets: Vec<String>,
}

/// Writes a catalog into a single-file archive
pub struct ArchiveWriter {
    export_date: Option<NaiveDateTime>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self { export_date: None }
    }

    /// Pin the export timestamp instead of using the current time
    pub fn with_export_date(mut self, export_date: NaiveDateTime) -> Self {
        self.export_date = Some(export_date);
        self
    }

    /// Write `records` and the `assets` they reference into `dest`.
    ///
    /// `assets` maps archive filenames to source files. The archive is
    /// staged next to `dest` and moved into place only once complete, so a
    /// failed write never leaves a truncated archive behind.
    pub fn write(
        &self,
        dest: &Path,
        mut records: Vec<CatalogRecord>,
        assets: &BTreeMap<String, PathBuf>,
    ) -> Result<WrittenArchive> {
        let dest = packaged_path(dest);
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut staging = NamedTempFile::new_in(&dir)?;
        let mut dropped_assets = Vec::new();

        {
            let mut zip = ZipWriter::new(staging.as_file_mut());
            let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            let deflated =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            // Images first, so references to any that disappeared can be
            // dropped before the manifest is written
            for (name, source) in assets {
                let mut file = match File::open(source) {
                    Ok(file) => file,
                    Err(e) => {
                        tracing::warn!("Failed to export image {}: {}", source.display(), e);
                        dropped_assets.push(name.clone());
                        continue;
                    }
                };
                zip.start_file(format!("{}/{}", ASSETS_DIR, name), stored)?;
                io::copy(&mut file, &mut zip)?;
            }

            if !dropped_assets.is_empty() {
                let dropped: HashSet<String> =
                    dropped_assets.iter().map(|name| asset_reference(name)).collect();
                for record in &mut records {
                    if record
                        .cover_image_path
                        .as_ref()
                        .is_some_and(|r| dropped.contains(r))
                    {
                        record.cover_image_path = None;
                    }
                }
            }

            let export_date = self.export_date.unwrap_or_else(now_seconds);
            let manifest = encode_manifest(&records, export_date)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

            zip.start_file(MANIFEST_ENTRY, deflated)?;
            zip.write_all(manifest.as_bytes())?;
            zip.finish()?;
        }

        staging.persist(&dest).map_err(|e| e.error)?;

        Ok(WrittenArchive {
            path: dest,
            records: records.len(),
            assets: assets.len() - dropped_assets.len(),
            dropped_assets,
        })
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Archives are always packaged: a `.json` destination becomes `.zip`
pub fn packaged_path(dest: &Path) -> PathBuf {
    match dest.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => dest.with_extension("zip"),
        _ => dest.to_path_buf(),
    }
}
