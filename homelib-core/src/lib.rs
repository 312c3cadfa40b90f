//! HomeLib Core Library
//!
//! This crate provides the catalog types, the record and cover stores, and
//! the import/export machinery for the HomeLib home library catalog.
//! Catalogs move between installations as single-file archives: a
//! structured-text manifest plus the cover images it references.

pub mod archive;
pub mod assets;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod relocate;
pub mod service;
pub mod store;
pub mod transfer;
pub mod types;

pub use assets::{AssetStore, LocalAssetStore};
pub use config::Config;
pub use error::{
    AssetError, ConfigError, FormatError, LibraryError, RecordError, Result, StoreError,
};
pub use reconcile::{Classification, DuplicateReason, Reconciler};
pub use relocate::AssetRelocator;
pub use service::LibraryService;
pub use store::{BookFilter, LibraryStats, MemoryStore, RecordStore, SqliteStore};
pub use transfer::{ExportSummary, ImportReport, Transfer};
pub use types::{ArchiveManifest, Author, Book, CatalogRecord, Category};
