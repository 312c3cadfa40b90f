//! Duplicate detection for incoming records
//!
//! A [`Reconciler`] is built once from a snapshot of the store at the start
//! of an import batch. Records written during the batch are not added to
//! it, so two incoming copies of the same book are both classified as new.

use crate::types::{Book, CatalogRecord};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Why an incoming record was judged to be already catalogued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateReason {
    Isbn10(String),
    Isbn13(String),
    TitleAndAuthors,
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateReason::Isbn10(isbn) => write!(f, "ISBN-10: {}", isbn),
            DuplicateReason::Isbn13(isbn) => write!(f, "ISBN-13: {}", isbn),
            DuplicateReason::TitleAndAuthors => write!(f, "Title and authors match"),
        }
    }
}

/// Outcome of checking one record against the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    New,
    Duplicate(DuplicateReason),
}

impl Classification {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Classification::Duplicate(_))
    }
}

type AuthorSet = BTreeSet<String>;

/// Classifies incoming records against a fixed view of the store
#[derive(Debug, Default)]
pub struct Reconciler {
    isbn10: HashSet<String>,
    isbn13: HashSet<String>,
    titles: HashMap<String, Vec<AuthorSet>>,
}

impl Reconciler {
    /// Index the books already in the store
    pub fn from_snapshot(books: &[Book]) -> Self {
        let mut reconciler = Self::default();
        for book in books {
            if let Some(isbn) = non_empty(book.isbn10.as_deref()) {
                reconciler.isbn10.insert(isbn.to_string());
            }
            if let Some(isbn) = non_empty(book.isbn13.as_deref()) {
                reconciler.isbn13.insert(isbn.to_string());
            }
            reconciler
                .titles
                .entry(book.title.to_lowercase())
                .or_default()
                .push(author_set(book.authors.iter().map(|a| a.name.as_str())));
        }
        tracing::debug!(
            "Duplicate snapshot: {} books, {} ISBN-10, {} ISBN-13",
            books.len(),
            reconciler.isbn10.len(),
            reconciler.isbn13.len()
        );
        reconciler
    }

    /// ISBN-10 first, then ISBN-13, then title plus author set
    pub fn classify(&self, record: &CatalogRecord) -> Classification {
        if let Some(isbn) = non_empty(record.isbn10.as_deref()) {
            if self.isbn10.contains(isbn) {
                return Classification::Duplicate(DuplicateReason::Isbn10(isbn.to_string()));
            }
        }
        if let Some(isbn) = non_empty(record.isbn13.as_deref()) {
            if self.isbn13.contains(isbn) {
                return Classification::Duplicate(DuplicateReason::Isbn13(isbn.to_string()));
            }
        }
        if let Some(existing) = self.titles.get(&record.title.to_lowercase()) {
            let incoming = author_set(record.authors.iter().map(String::as_str));
            if existing.contains(&incoming) {
                return Classification::Duplicate(DuplicateReason::TitleAndAuthors);
            }
        }
        Classification::New
    }
}

/// The line reported for a skipped record
pub fn skip_message(title: &str, reason: &DuplicateReason) -> String {
    format!("Skipped '{}' ({})", title, reason)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn author_set<'a>(names: impl Iterator<Item = &'a str>) -> AuthorSet {
    names.map(str::to_lowercase).collect()
}
