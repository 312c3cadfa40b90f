//! Record store abstraction
//!
//! The catalog's persistent home. Import/export and the library service
//! only ever talk to a [`RecordStore`]; which backend sits behind it is
//! decided by whoever constructs them.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::types::{Author, Book, Category};
use serde::Serialize;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistent catalog of books, authors and categories
pub trait RecordStore: Send + Sync {
    /// Every book, ordered by title
    fn list_all(&self) -> StoreResult<Vec<Book>>;

    fn find_by_id(&self, id: i64) -> StoreResult<Option<Book>>;

    /// First book whose ISBN-10 or ISBN-13 equals `isbn`
    fn find_by_isbn(&self, isbn: &str) -> StoreResult<Option<Book>>;

    /// Insert a book without an id, update one with an id.
    ///
    /// Category and authors without ids are matched by name, and created
    /// when no match exists. Returns the book with all ids filled in.
    fn save(&self, book: Book) -> StoreResult<Book>;

    /// Delete a book; `false` if it did not exist
    fn delete(&self, id: i64) -> StoreResult<bool>;

    /// Case-insensitive substring search over the descriptive fields
    fn search(&self, query: &str) -> StoreResult<Vec<Book>>;

    fn filter(&self, filter: &BookFilter) -> StoreResult<Vec<Book>>;

    /// All categories, ordered by name
    fn categories(&self) -> StoreResult<Vec<Category>>;

    /// All authors, ordered by name
    fn authors(&self) -> StoreResult<Vec<Author>>;

    fn stats(&self) -> StoreResult<LibraryStats> {
        let books = self.list_all()?;
        Ok(LibraryStats {
            total_books: books.len(),
            read_books: books.iter().filter(|b| b.is_read).count(),
            unread_books: books.iter().filter(|b| !b.is_read).count(),
            borrowed_books: books.iter().filter(|b| b.is_borrowed).count(),
            total_authors: self.authors()?.len(),
            total_categories: self.categories()?.len(),
        })
    }
}

/// Narrowing criteria for [`RecordStore::filter`]; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub category: Option<String>,
    pub is_read: Option<bool>,
    pub is_borrowed: Option<bool>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(category) = &self.category {
            let same = book
                .category_name()
                .is_some_and(|name| name.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        self.is_read.map_or(true, |read| book.is_read == read)
            && self
                .is_borrowed
                .map_or(true, |borrowed| book.is_borrowed == borrowed)
    }
}

/// Whether any searchable field of `book` contains `query`, ignoring case
pub fn matches_query(book: &Book, query: &str) -> bool {
    let needle = query.to_lowercase();
    let contains =
        |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(&needle));

    contains(Some(&book.title))
        || contains(book.subtitle.as_deref())
        || contains(book.isbn10.as_deref())
        || contains(book.isbn13.as_deref())
        || contains(book.category_name())
        || contains(book.tags.as_deref())
        || contains(book.publisher.as_deref())
        || contains(book.physical_location.as_deref())
        || contains(book.borrowed_to.as_deref())
        || book.authors.iter().any(|a| contains(Some(&a.name)))
}

/// Drop authors whose id already appears earlier in the list, keeping the
/// first occurrence and the order of the rest
pub(crate) fn dedupe_authors(book: &mut Book) {
    let mut seen = std::collections::HashSet::new();
    book.authors.retain(|author| {
        let first = author.id.map_or(true, |id| seen.insert(id));
        if !first {
            tracing::debug!("Dropping repeated author '{}' on '{}'", author.name, book.title);
        }
        first
    });
}

/// Headline numbers about the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total_books: usize,
    pub read_books: usize,
    pub unread_books: usize,
    pub borrowed_books: usize,
    pub total_authors: usize,
    pub total_categories: usize,
}

impl std::fmt::Display for LibraryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total: {} books, Read: {}, Unread: {}, Borrowed: {}, Authors: {}, Categories: {}",
            self.total_books,
            self.read_books,
            self.unread_books,
            self.borrowed_books,
            self.total_authors,
            self.total_categories
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches() {
        let mut book = Book::new("Dune").with_category("Science Fiction");
        book.is_read = true;

        assert!(BookFilter::default().matches(&book));
        assert!(BookFilter {
            category: Some("science fiction".to_string()),
            is_read: Some(true),
            ..BookFilter::default()
        }
        .matches(&book));
        assert!(!BookFilter {
            is_borrowed: Some(true),
            ..BookFilter::default()
        }
        .matches(&book));
    }

    #[test]
    fn test_query_matches_authors_and_tags() {
        let mut book = Book::new("Dune").with_author("Frank Herbert");
        book.tags = Some("desert, politics".to_string());

        assert!(matches_query(&book, "herbert"));
        assert!(matches_query(&book, "POLITICS"));
        assert!(!matches_query(&book, "tolkien"));
    }
}
