//! Catalog import and export
//!
//! [`Transfer`] sequences the archive codec, duplicate reconciler and asset
//! relocator. Export is all-or-nothing. Import is per record: a bad record
//! is reported and the batch carries on.

use crate::archive::{ArchiveWriter, UnpackedArchive};
use crate::assets::AssetStore;
use crate::error::{RecordError, Result};
use crate::reconcile::{skip_message, Classification, Reconciler};
use crate::relocate::AssetRelocator;
use crate::store::RecordStore;
use crate::types::{now_seconds, Book, CatalogRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Progress callback: records processed so far, and the total
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Outcome of an export
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// Where the archive was written
    pub path: PathBuf,

    pub books: usize,

    /// Cover images packaged
    pub assets: usize,

    /// Titles of books whose cover file could not be found
    pub missing_assets: Vec<String>,
}

/// Outcome of an import batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub success_count: usize,

    /// One message per record that failed to parse or save
    pub errors: Vec<String>,

    /// One message per record already in the catalog
    pub skipped: Vec<String>,
}

impl ImportReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn skip_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Records seen in the archive, whatever happened to them
    pub fn total(&self) -> usize {
        self.success_count + self.error_count() + self.skip_count()
    }
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported: {}, Skipped: {}, Errors: {}",
            self.success_count,
            self.skip_count(),
            self.error_count()
        )
    }
}

/// Moves a catalog between a record store and single-file archives
pub struct Transfer<'a> {
    records: &'a dyn RecordStore,
    assets: &'a dyn AssetStore,
    temp_root: Option<PathBuf>,
    writer: ArchiveWriter,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Transfer<'a> {
    pub fn new(records: &'a dyn RecordStore, assets: &'a dyn AssetStore) -> Self {
        Self {
            records,
            assets,
            temp_root: None,
            writer: ArchiveWriter::new(),
            progress: None,
        }
    }

    /// Unpack imported archives under `dir` instead of the system temp directory
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Use a custom archive writer (e.g. with a pinned export date)
    pub fn with_writer(mut self, writer: ArchiveWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Report per-record progress during import and export
    pub fn with_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn report_progress(&self, done: usize, total: usize) {
        if let Some(progress) = self.progress {
            progress(done, total);
        }
    }

    /// Write the whole catalog to `dest`.
    ///
    /// A `.json` destination is written as `.zip`; the returned summary
    /// carries the final path. Any store or write failure fails the export
    /// and leaves no archive behind.
    pub fn export(&self, dest: &Path) -> Result<ExportSummary> {
        tracing::info!("Exporting books to: {}", dest.display());

        let books = self.records.list_all()?;
        let relocator = AssetRelocator::new(self.assets);

        let mut records = Vec::with_capacity(books.len());
        let mut staged: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut staged_titles: Vec<(String, String)> = Vec::new();
        let mut missing_assets = Vec::new();

        for (index, book) in books.iter().enumerate() {
            let mut record = CatalogRecord::from(book);
            if has_cover(book) {
                match relocator.stage_for_export(book) {
                    Some((name, source)) => {
                        AssetRelocator::export_reference(&mut record, &name);
                        staged_titles.push((book.title.clone(), name.clone()));
                        staged.insert(name, source);
                    }
                    None => missing_assets.push(book.title.clone()),
                }
            }
            records.push(record);
            self.report_progress(index + 1, books.len());
        }

        let written = self.writer.write(dest, records, &staged)?;
        for dropped in &written.dropped_assets {
            missing_assets.extend(
                staged_titles
                    .iter()
                    .filter(|(_, name)| name == dropped)
                    .map(|(title, _)| title.clone()),
            );
        }

        tracing::info!(
            "Successfully exported {} books and {} images to {}",
            written.records,
            written.assets,
            written.path.display()
        );

        Ok(ExportSummary {
            path: written.path,
            books: written.records,
            assets: written.assets,
            missing_assets,
        })
    }

    /// Add the books in the archive at `src` to the catalog.
    ///
    /// Fails as a whole only when the archive cannot be read or the store
    /// cannot be listed; in both cases nothing is written. Otherwise every
    /// record is accounted for in the report. The unpack directory is
    /// removed on every path.
    pub fn import(&self, src: &Path) -> Result<ImportReport> {
        tracing::info!("Importing books from: {}", src.display());

        let mut archive = UnpackedArchive::open_in(src, self.temp_root.as_deref())?;
        let result = self.import_unpacked(&mut archive);

        if let Err(e) = archive.close() {
            tracing::warn!("Failed to remove import directory: {}", e);
        }

        let report = result?;
        tracing::info!("Import finished: {}", report);
        Ok(report)
    }

    fn import_unpacked(&self, archive: &mut UnpackedArchive) -> Result<ImportReport> {
        let reconciler = Reconciler::from_snapshot(&self.records.list_all()?);
        let manifest = archive.take_manifest();
        let archive: &UnpackedArchive = archive;
        let relocator = AssetRelocator::new(self.assets);

        let mut report = ImportReport {
            errors: manifest.rejected.iter().map(ToString::to_string).collect(),
            ..ImportReport::default()
        };

        let total = manifest.records.len();
        for (index, record) in manifest.records.into_iter().enumerate() {
            match reconciler.classify(&record) {
                Classification::Duplicate(reason) => {
                    tracing::info!("Skipping duplicate book: {} - {}", record.title, reason);
                    report.skipped.push(skip_message(&record.title, &reason));
                }
                Classification::New => {
                    let title = record.title.clone();
                    match self.import_record(record, archive, &relocator) {
                        Ok(book) => {
                            tracing::debug!("Imported book: {}", book.title);
                            report.success_count += 1;
                        }
                        Err(message) => {
                            let err = RecordError::new(Some(&title), message);
                            tracing::error!("{}", err);
                            report.errors.push(err.to_string());
                        }
                    }
                }
            }
            self.report_progress(index + 1, total);
        }

        Ok(report)
    }

    fn import_record(
        &self,
        mut record: CatalogRecord,
        archive: &UnpackedArchive,
        relocator: &AssetRelocator<'_>,
    ) -> std::result::Result<Book, String> {
        relocator
            .adopt(&mut record, Some(archive))
            .map_err(|e| e.to_string())?;

        let mut book = record.into_book();
        book.id = None;
        if book.date_added.is_none() {
            book.date_added = Some(now_seconds());
        }

        self.records.save(book).map_err(|e| e.to_string())
    }
}

fn has_cover(book: &Book) -> bool {
    book.cover_image_path
        .as_deref()
        .is_some_and(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LocalAssetStore;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    #[test]
    fn test_report_counts() {
        let report = ImportReport {
            success_count: 2,
            errors: vec!["Failed to import book 'x': boom".to_string()],
            skipped: vec![],
        };
        assert_eq!(report.total(), 3);
        assert!(report.has_errors());
        assert!(!report.has_skipped());
        assert_eq!(report.to_string(), "Imported: 2, Skipped: 0, Errors: 1");
    }

    #[test]
    fn test_export_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let assets = LocalAssetStore::new(dir.path().join("covers"));

        let summary = Transfer::new(&store, &assets)
            .export(&dir.path().join("library.json"))
            .unwrap();
        assert_eq!(summary.books, 0);
        assert_eq!(summary.path, dir.path().join("library.zip"));
        assert!(summary.path.is_file());
    }

    #[test]
    fn test_progress_is_reported() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.save(Book::new("Dune")).unwrap();
        store.save(Book::new("Emma")).unwrap();
        let assets = LocalAssetStore::new(dir.path().join("covers"));

        let calls = AtomicUsize::new(0);
        let progress = |done: usize, total: usize| {
            assert!(done <= total);
            calls.fetch_add(1, Ordering::Relaxed);
        };
        Transfer::new(&store, &assets)
            .with_progress(&progress)
            .export(&dir.path().join("out.zip"))
            .unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_rejected_entries_are_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, r#"{"books": [{"title": "Emma"}, 42]}"#).unwrap();

        let store = MemoryStore::new();
        let assets = LocalAssetStore::new(dir.path().join("covers"));
        let report = Transfer::new(&store, &assets).import(&path).unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.error_count(), 1);
        assert!(report.errors[0].starts_with("Failed to import book 'unknown'"));
    }
}
