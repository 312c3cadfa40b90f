//! CLI command implementations

mod books;
mod transfer;

pub use books::{add, cover, delete, edit, list, search, show, stats, BookEdit, NewBook};
pub use transfer::{export, import};

use anyhow::{Context, Result};
use homelib_core::{Config, LibraryService, LocalAssetStore, SqliteStore};
use std::path::Path;

/// The opened catalog: configuration, database and cover directory
pub struct Catalog {
    pub config: Config,
    pub store: SqliteStore,
    pub assets: LocalAssetStore,
}

impl Catalog {
    /// Open the catalog in the resolved data directory, creating it on first use
    pub fn open(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = Config::resolve_data_dir(data_dir);
        let config = Config::load(&data_dir)
            .with_context(|| format!("Failed to load configuration from {}", data_dir.display()))?;

        let database = config.database_path();
        let store = SqliteStore::open(&database)
            .with_context(|| format!("Failed to open database {}", database.display()))?;
        let assets = LocalAssetStore::new(config.covers_path());

        tracing::debug!("Using data directory {}", data_dir.display());
        Ok(Self {
            config,
            store,
            assets,
        })
    }

    pub fn service(&self) -> LibraryService<'_> {
        LibraryService::new(&self.store, &self.assets)
    }
}
