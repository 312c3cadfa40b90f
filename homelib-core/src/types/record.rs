//! The portable, id-free form of a book carried inside an archive

use super::{Author, Book, Category};
use chrono::NaiveDateTime;
use serde::Serialize;

/// One book as it appears in an archive manifest.
///
/// Category and authors are denormalized to names so the record means the
/// same thing in any catalog. Field order here is the order fields are
/// written to the manifest.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn10: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_published: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shelf_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_location: Option<String>,

    /// `assets/<filename>` inside an archive; an absolute store path once imported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_path: Option<String>,

    pub is_read: bool,

    pub is_borrowed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrowed_to: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::archive::manifest::serialize_timestamp"
    )]
    pub date_added: Option<NaiveDateTime>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::archive::manifest::serialize_timestamp"
    )]
    pub borrowed_date: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    pub authors: Vec<String>,
}

impl CatalogRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Turn the record into an unsaved book: no book, author or category ids
    pub fn into_book(self) -> Book {
        Book {
            id: None,
            title: self.title,
            subtitle: self.subtitle,
            isbn10: self.isbn10,
            isbn13: self.isbn13,
            publisher: self.publisher,
            year_published: self.year_published,
            category: self.category.map(Category::new),
            shelf_location: self.shelf_location,
            tags: self.tags,
            format: self.format,
            language: self.language,
            notes: self.notes,
            date_added: self.date_added,
            is_read: self.is_read,
            rating: self.rating,
            cover_image_path: self.cover_image_path,
            physical_location: self.physical_location,
            is_borrowed: self.is_borrowed,
            borrowed_to: self.borrowed_to,
            borrowed_date: self.borrowed_date,
            authors: self.authors.into_iter().map(Author::new).collect(),
        }
    }
}

impl From<&Book> for CatalogRecord {
    /// Cover references are not carried over; they only become valid once
    /// the asset has been staged into an archive.
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            subtitle: book.subtitle.clone(),
            isbn10: book.isbn10.clone(),
            isbn13: book.isbn13.clone(),
            publisher: book.publisher.clone(),
            year_published: book.year_published,
            shelf_location: book.shelf_location.clone(),
            tags: book.tags.clone(),
            format: book.format.clone(),
            language: book.language.clone(),
            notes: book.notes.clone(),
            physical_location: book.physical_location.clone(),
            cover_image_path: None,
            is_read: book.is_read,
            is_borrowed: book.is_borrowed,
            borrowed_to: book.borrowed_to.clone(),
            rating: book.rating,
            date_added: book.date_added,
            borrowed_date: book.borrowed_date,
            category: book.category.as_ref().map(|c| c.name.clone()),
            authors: book.authors.iter().map(|a| a.name.clone()).collect(),
        }
    }
}
