//! Single-file catalog archives
//!
//! An archive is a ZIP package holding a `library.json` manifest and an
//! `assets/` folder of cover images. A bare manifest file is accepted on
//! import too; it simply carries no images.

pub mod manifest;
mod reader;
mod writer;

pub use manifest::{decode_manifest, encode_manifest, format_timestamp, parse_timestamp};
pub use reader::UnpackedArchive;
pub use writer::{packaged_path, ArchiveWriter, WrittenArchive};

/// Name of the manifest entry inside a packaged archive
pub const MANIFEST_ENTRY: &str = "library.json";

/// Folder holding cover images inside a packaged archive
pub const ASSETS_DIR: &str = "assets";

/// The archive-relative reference for an asset filename
pub fn asset_reference(file_name: &str) -> String {
    format!("{}/{}", ASSETS_DIR, file_name)
}
