//! Everyday catalog operations over a record store and its cover directory

use crate::assets::AssetStore;
use crate::error::{AssetError, Result, StoreError};
use crate::store::{BookFilter, LibraryStats, RecordStore};
use crate::types::{Author, Book, Category};
use std::path::Path;

const DEFAULT_COVER_EXTENSION: &str = ".jpg";

/// Catalog operations that keep books and their cover files in step
pub struct LibraryService<'a> {
    records: &'a dyn RecordStore,
    assets: &'a dyn AssetStore,
}

impl<'a> LibraryService<'a> {
    pub fn new(records: &'a dyn RecordStore, assets: &'a dyn AssetStore) -> Self {
        Self { records, assets }
    }

    /// Insert or update a book
    pub fn save_book(&self, book: Book) -> Result<Book> {
        let saved = self.records.save(book)?;
        tracing::info!("Saved book: {}", saved.title);
        Ok(saved)
    }

    pub fn find_book(&self, id: i64) -> Result<Option<Book>> {
        Ok(self.records.find_by_id(id)?)
    }

    pub fn all_books(&self) -> Result<Vec<Book>> {
        Ok(self.records.list_all()?)
    }

    /// Blank queries list everything
    pub fn search(&self, query: &str) -> Result<Vec<Book>> {
        let query = query.trim();
        if query.is_empty() {
            return self.all_books();
        }
        Ok(self.records.search(query)?)
    }

    pub fn filter(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        Ok(self.records.filter(filter)?)
    }

    /// Delete a book and its cover file.
    ///
    /// A cover that cannot be removed is logged; the book is deleted anyway.
    pub fn delete_book(&self, id: i64) -> Result<bool> {
        let cover = self
            .records
            .find_by_id(id)?
            .and_then(|book| book.cover_image_path);

        let deleted = self.records.delete(id)?;
        if deleted {
            if let Some(cover) = cover.filter(|c| !c.is_empty()) {
                match self.assets.delete(Path::new(&cover)) {
                    Ok(()) => tracing::info!("Deleted cover image: {}", cover),
                    Err(e) => tracing::error!("Failed to delete cover image {}: {}", cover, e),
                }
            }
        }
        Ok(deleted)
    }

    /// Copy `source` into the cover directory as `<id><ext>` and attach it
    pub fn set_cover(&self, id: i64, source: &Path) -> Result<Book> {
        if !source.is_file() {
            return Err(AssetError::Missing(source.to_path_buf()).into());
        }
        let mut book = self
            .records
            .find_by_id(id)?
            .ok_or(StoreError::NotFound(id))?;

        let name = format!("{}{}", id, cover_extension(source));
        let target = self.assets.import_file(&name, source)?;
        tracing::info!("Uploaded cover image: {}", target.display());

        book.cover_image_path = Some(target.to_string_lossy().into_owned());
        Ok(self.records.save(book)?)
    }

    pub fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.records.categories()?)
    }

    pub fn authors(&self) -> Result<Vec<Author>> {
        Ok(self.records.authors()?)
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        Ok(self.records.stats()?)
    }
}

/// Extension of `path` including the dot, `.jpg` when there is none
fn cover_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_COVER_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LocalAssetStore;
    use crate::error::LibraryError;
    use crate::store::MemoryStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cover_extension() {
        assert_eq!(cover_extension(Path::new("scan.png")), ".png");
        assert_eq!(cover_extension(Path::new("scan")), ".jpg");
        assert_eq!(cover_extension(Path::new(".hidden")), ".jpg");
    }

    #[test]
    fn test_set_cover_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let assets = LocalAssetStore::new(dir.path().join("covers"));
        let service = LibraryService::new(&store, &assets);

        let book = service.save_book(Book::new("Dune")).unwrap();
        let id = book.id.unwrap();

        let image = dir.path().join("scan.png");
        fs::write(&image, b"png").unwrap();
        let book = service.set_cover(id, &image).unwrap();

        let cover = book.cover_image_path.unwrap();
        assert!(cover.ends_with(&format!("{}.png", id)));
        assert!(Path::new(&cover).is_file());

        assert!(service.delete_book(id).unwrap());
        assert!(!Path::new(&cover).exists());
        assert!(!service.delete_book(id).unwrap());
    }

    #[test]
    fn test_set_cover_errors() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let assets = LocalAssetStore::new(dir.path().join("covers"));
        let service = LibraryService::new(&store, &assets);

        let missing = service.set_cover(1, &dir.path().join("nope.jpg"));
        assert!(matches!(missing, Err(LibraryError::Asset(AssetError::Missing(_)))));

        let image = dir.path().join("scan.jpg");
        fs::write(&image, b"jpg").unwrap();
        let unknown = service.set_cover(42, &image);
        assert!(matches!(unknown, Err(LibraryError::Store(StoreError::NotFound(42)))));
    }

    #[test]
    fn test_blank_search_lists_all() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let assets = LocalAssetStore::new(dir.path());
        let service = LibraryService::new(&store, &assets);

        service.save_book(Book::new("Dune")).unwrap();
        service.save_book(Book::new("Emma")).unwrap();
        assert_eq!(service.search("  ").unwrap().len(), 2);
        assert_eq!(service.search("dun").unwrap().len(), 1);
    }
}
