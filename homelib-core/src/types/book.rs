//! Store-side catalog entities

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Highest star rating a book can carry
pub const MAX_RATING: u8 = 5;

/// An author, identified by id inside the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: Option<i64>,
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// A shelf category, identified by id inside the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// A book as held by the record store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    /// Store identity, `None` until first saved
    pub id: Option<i64>,

    pub title: String,
    pub subtitle: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub publisher: Option<String>,
    pub year_published: Option<i32>,
    pub category: Option<Category>,

    /// Shelf label, e.g. "B3"
    pub shelf_location: Option<String>,

    /// Free-text, comma separated by convention
    pub tags: Option<String>,

    pub format: Option<String>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub date_added: Option<NaiveDateTime>,
    pub is_read: bool,

    /// Star rating, 0 to 5
    pub rating: Option<u8>,

    /// Absolute path of the cover inside the asset directory
    pub cover_image_path: Option<String>,

    /// Room or building the book lives in
    pub physical_location: Option<String>,

    pub is_borrowed: bool,
    pub borrowed_to: Option<String>,
    pub borrowed_date: Option<NaiveDateTime>,
    pub authors: Vec<Author>,
}

impl Book {
    /// Create a new unsaved book with the given title, stamped with the current time
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            subtitle: None,
            isbn10: None,
            isbn13: None,
            publisher: None,
            year_published: None,
            category: None,
            shelf_location: None,
            tags: None,
            format: None,
            language: None,
            notes: None,
            date_added: Some(now_seconds()),
            is_read: false,
            rating: None,
            cover_image_path: None,
            physical_location: None,
            is_borrowed: false,
            borrowed_to: None,
            borrowed_date: None,
            authors: Vec::new(),
        }
    }

    /// Add an author by name
    pub fn with_author(mut self, name: impl Into<String>) -> Self {
        self.authors.push(Author::new(name));
        self
    }

    /// Set the category by name
    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        self.category = Some(Category::new(name));
        self
    }

    pub fn with_isbn10(mut self, isbn: impl Into<String>) -> Self {
        self.isbn10 = Some(isbn.into());
        self
    }

    pub fn with_isbn13(mut self, isbn: impl Into<String>) -> Self {
        self.isbn13 = Some(isbn.into());
        self
    }

    /// Author names in catalog order
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }

    /// Mark the book as lent to `borrower` as of now
    pub fn lend_to(&mut self, borrower: impl Into<String>) {
        self.is_borrowed = true;
        self.borrowed_to = Some(borrower.into());
        self.borrowed_date = Some(now_seconds());
    }

    /// Clear all borrowing details
    pub fn mark_returned(&mut self) {
        self.is_borrowed = false;
        self.borrowed_to = None;
        self.borrowed_date = None;
    }

    /// Check the invariants every stored book must satisfy
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if let Some(rating) = self.rating {
            if rating > MAX_RATING {
                return Err(format!("rating {} is outside 0-{}", rating, MAX_RATING));
            }
        }
        Ok(())
    }
}

/// Current local time truncated to whole seconds, the precision the store keeps
pub(crate) fn now_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_creation() {
        let book = Book::new("Dune")
            .with_author("Frank Herbert")
            .with_category("Science Fiction");

        assert_eq!(book.title, "Dune");
        assert_eq!(book.author_names(), vec!["Frank Herbert"]);
        assert_eq!(book.category_name(), Some("Science Fiction"));
        assert!(book.id.is_none());
        assert!(book.date_added.is_some());
        assert!(!book.is_read);
    }

    #[test]
    fn test_lend_and_return() {
        let mut book = Book::new("Dune");
        book.lend_to("Alice");
        assert!(book.is_borrowed);
        assert_eq!(book.borrowed_to.as_deref(), Some("Alice"));
        assert_eq!(book.borrowed_date.unwrap().nanosecond(), 0);

        book.mark_returned();
        assert!(!book.is_borrowed);
        assert!(book.borrowed_to.is_none());
        assert!(book.borrowed_date.is_none());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let book = Book::new("   ");
        assert!(book.validate().is_err());
    }

    #[test]
    fn test_validate_rating_range() {
        let mut book = Book::new("Emma");
        book.rating = Some(5);
        assert!(book.validate().is_ok());

        book.rating = Some(6);
        assert!(book.validate().is_err());
    }
}
