//! Moving cover images across the archive/store boundary

use crate::archive::{asset_reference, manifest::asset_file_name, UnpackedArchive};
use crate::assets::AssetStore;
use crate::error::AssetError;
use crate::types::{Book, CatalogRecord};
use std::path::{Path, PathBuf};

/// Rewrites cover references between store paths and archive paths
pub struct AssetRelocator<'a> {
    assets: &'a dyn AssetStore,
}

impl<'a> AssetRelocator<'a> {
    pub fn new(assets: &'a dyn AssetStore) -> Self {
        Self { assets }
    }

    /// Locate the cover file for `book` on disk.
    ///
    /// Returns the archive filename and the source file to package, or
    /// `None` when the book has no cover or its file has gone missing.
    /// Relative cover paths are looked up in the asset directory.
    pub fn stage_for_export(&self, book: &Book) -> Option<(String, PathBuf)> {
        let cover = book.cover_image_path.as_deref().filter(|p| !p.is_empty())?;

        let mut source = PathBuf::from(cover);
        if source.is_relative() && !source.is_file() {
            if let Some(name) = source.file_name() {
                source = self.assets.root().join(name);
            }
        }

        if !source.is_file() {
            tracing::warn!(
                "Cover for '{}' not found, exporting without it: {}",
                book.title,
                cover
            );
            return None;
        }

        let name = source.file_name()?.to_str()?.to_string();
        Some((name, source))
    }

    /// Point `record` at its archive copy of the cover
    pub fn export_reference(record: &mut CatalogRecord, file_name: &str) {
        record.cover_image_path = Some(asset_reference(file_name));
    }

    /// Copy the record's cover out of `archive` into the asset store.
    ///
    /// A reference that does not resolve to an unpacked file is cleared and
    /// the record imports without a cover. A failed copy is returned, and
    /// the record keeps no reference.
    pub fn adopt(
        &self,
        record: &mut CatalogRecord,
        archive: Option<&UnpackedArchive>,
    ) -> Result<(), AssetError> {
        let Some(reference) = record.cover_image_path.take().filter(|r| !r.is_empty()) else {
            return Ok(());
        };

        let resolved = match archive {
            Some(archive) => archive.resolve_asset(&reference),
            None => Err(AssetError::Missing(PathBuf::from(&reference))),
        };
        let source = match resolved {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!("Image for '{}' not in archive: {}", record.title, err);
                return Ok(());
            }
        };

        let name = asset_file_name(&reference)
            .ok_or_else(|| AssetError::UnsafeReference(reference.clone()))?;
        let target = self.assets.import_file(&name, &source)?;
        tracing::debug!("Imported image: {}", name);

        record.cover_image_path = Some(path_string(&target));
        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
