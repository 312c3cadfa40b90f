//! Core catalog types

mod book;
mod manifest;
mod record;

pub use book::{Author, Book, Category, MAX_RATING};
pub(crate) use book::now_seconds;
pub use manifest::ArchiveManifest;
pub use record::CatalogRecord;
