//! Manifest text encoding and permissive decoding
//!
//! The manifest is a structured-text document:
//!
//! ```text
//! {
//!   "exportDate": "2024-05-01T10:00:00",
//!   "version": "2.0",
//!   "books": [ { "title": "...", ..., "authors": [] } ]
//! }
//! ```
//!
//! Decoding works field by field so that one bad value only costs that
//! value (or at worst that one book), never the whole archive.

use crate::error::{FormatError, RecordError};
use crate::types::{ArchiveManifest, CatalogRecord, MAX_RATING};
use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const SPACED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument<'a> {
    export_date: String,
    version: &'a str,
    books: &'a [CatalogRecord],
}

/// Render a timestamp the way manifests store it
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a manifest timestamp, with or without fractional seconds
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, SPACED_TIMESTAMP_FORMAT))
        .ok()
}

pub(crate) fn serialize_timestamp<S>(
    value: &Option<NaiveDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}

/// Encode records into manifest text
pub fn encode_manifest(
    records: &[CatalogRecord],
    export_date: NaiveDateTime,
) -> Result<String, serde_json::Error> {
    let document = ManifestDocument {
        export_date: format_timestamp(&export_date),
        version: ArchiveManifest::FORMAT_VERSION,
        books: records,
    };
    let mut text = serde_json::to_string_pretty(&document)?;
    text.push('\n');
    Ok(text)
}

/// Decode manifest text.
///
/// Fails only when the text is not a structured document or has no
/// `books` array. Bad book entries land in [`ArchiveManifest::rejected`].
pub fn decode_manifest(text: &str) -> Result<ArchiveManifest, FormatError> {
    let text = text.trim_start_matches('\u{feff}');
    let root: Value =
        serde_json::from_str(text).map_err(|e| FormatError::Malformed(e.to_string()))?;

    let books = root
        .get("books")
        .and_then(Value::as_array)
        .ok_or(FormatError::MissingRecords)?;

    let mut manifest = ArchiveManifest {
        export_date: root
            .get("exportDate")
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        version: root
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string),
        ..ArchiveManifest::default()
    };

    if manifest.version.is_none() {
        tracing::debug!("Manifest has no version tag, reading as legacy layout");
    }

    for (index, entry) in books.iter().enumerate() {
        match decode_record(entry) {
            Ok(record) => {
                if let Some(name) = record.cover_image_path.as_deref().and_then(asset_file_name) {
                    manifest.assets.insert(name);
                }
                manifest.records.push(record);
            }
            Err(err) => {
                tracing::warn!("Rejected book entry #{}: {}", index + 1, err.message);
                manifest.rejected.push(err);
            }
        }
    }

    Ok(manifest)
}

/// Filename component of an archive-relative asset reference
pub fn asset_file_name(reference: &str) -> Option<String> {
    Path::new(reference)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
}

fn decode_record(entry: &Value) -> Result<CatalogRecord, RecordError> {
    let obj = entry
        .as_object()
        .ok_or_else(|| RecordError::new(None, "book entry is not an object"))?;

    let title = match string_field(obj, "title") {
        Some(title) if !title.trim().is_empty() => title,
        _ => return Err(RecordError::new(None, "book entry has no title")),
    };

    let mut record = CatalogRecord::new(title);
    record.subtitle = string_field(obj, "subtitle");
    record.isbn10 = string_field(obj, "isbn10");
    record.isbn13 = string_field(obj, "isbn13");
    record.publisher = string_field(obj, "publisher");
    record.shelf_location = string_field(obj, "shelfLocation");
    record.tags = string_field(obj, "tags");
    record.format = string_field(obj, "format");
    record.language = string_field(obj, "language");
    record.notes = string_field(obj, "notes");
    record.physical_location = string_field(obj, "physicalLocation");
    record.cover_image_path = string_field(obj, "coverImagePath");
    record.borrowed_to = string_field(obj, "borrowedTo");
    record.category = string_field(obj, "category");

    record.year_published = integer_field(obj, "yearPublished", &record.title)
        .and_then(|year| i32::try_from(year).ok());

    record.rating = integer_field(obj, "rating", &record.title).and_then(|rating| {
        match u8::try_from(rating) {
            Ok(r) if r <= MAX_RATING => Some(r),
            _ => {
                tracing::warn!("Ignoring out-of-range rating {} on '{}'", rating, record.title);
                None
            }
        }
    });

    record.is_read = bool_field(obj, "isRead");
    record.is_borrowed = bool_field(obj, "isBorrowed");
    record.date_added = timestamp_field(obj, "dateAdded", &record.title);
    record.borrowed_date = timestamp_field(obj, "borrowedDate", &record.title);

    record.authors = obj
        .get("authors")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(record)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Integers may arrive as numbers or, from older writers, as quoted strings
fn integer_field(obj: &Map<String, Value>, key: &str, title: &str) -> Option<i64> {
    let parsed = match obj.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => return None,
        _ => None,
    };
    if parsed.is_none() {
        tracing::warn!("Ignoring unparsable {} on '{}'", key, title);
    }
    parsed
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

fn timestamp_field(obj: &Map<String, Value>, key: &str, title: &str) -> Option<NaiveDateTime> {
    let raw = string_field(obj, key)?;
    let parsed = parse_timestamp(&raw);
    if parsed.is_none() {
        tracing::warn!("Ignoring unparsable {} '{}' on '{}'", key, raw, title);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        let mut record = CatalogRecord::new("Dune");
        record.authors = vec!["Frank Herbert".to_string()];

        let text = encode_manifest(&[record], fixed_time()).unwrap();
        assert!(text.contains("\"exportDate\": \"2024-05-01T10:30:00\""));
        assert!(text.contains("\"version\": \"2.0\""));
        assert!(text.contains("\"isRead\": false"));
        assert!(text.contains("\"isBorrowed\": false"));
        assert!(text.contains("\"authors\": ["));
        assert!(!text.contains("null"));
        assert!(!text.contains("subtitle"));
        assert!(!text.contains("category"));
        assert!(!text.contains("coverImagePath"));
    }

    #[test]
    fn test_encode_writes_empty_author_list() {
        let text = encode_manifest(&[CatalogRecord::new("Anonymous")], fixed_time()).unwrap();
        assert!(text.contains("\"authors\": []"));
    }

    #[test]
    fn test_field_order_follows_record() {
        let mut record = CatalogRecord::new("Dune");
        record.isbn13 = Some("9780441013593".to_string());
        record.category = Some("SF".to_string());
        let text = encode_manifest(&[record], fixed_time()).unwrap();

        let title = text.find("\"title\"").unwrap();
        let isbn = text.find("\"isbn13\"").unwrap();
        let category = text.find("\"category\"").unwrap();
        let authors = text.find("\"authors\"").unwrap();
        assert!(title < isbn && isbn < category && category < authors);
    }

    #[test]
    fn test_decode_full_record() {
        let text = r#"{
          "exportDate": "2024-05-01T10:30:00.123",
          "version": "2.0",
          "books": [
            {
              "title": "Dune",
              "isbn13": "9780441013593",
              "yearPublished": 1965,
              "coverImagePath": "assets/dune.jpg",
              "isRead": true,
              "isBorrowed": false,
              "rating": 5,
              "dateAdded": "2023-01-02T03:04:05",
              "category": "Science Fiction",
              "authors": ["Frank Herbert"]
            }
          ]
        }"#;

        let manifest = decode_manifest(text).unwrap();
        assert_eq!(manifest.version.as_deref(), Some("2.0"));
        assert!(manifest.export_date.is_some());
        assert_eq!(manifest.records.len(), 1);

        let record = &manifest.records[0];
        assert_eq!(record.title, "Dune");
        assert_eq!(record.year_published, Some(1965));
        assert_eq!(record.rating, Some(5));
        assert!(record.is_read);
        assert_eq!(record.category.as_deref(), Some("Science Fiction"));
        assert_eq!(record.authors, vec!["Frank Herbert"]);
        assert!(manifest.assets.contains("dune.jpg"));
    }

    #[test]
    fn test_decode_legacy_string_values() {
        let text = r#"{"books": [{
            "title": "Emma",
            "yearPublished": "1815",
            "rating": "4",
            "isRead": "true"
        }]}"#;

        let manifest = decode_manifest(text).unwrap();
        assert!(manifest.version.is_none());
        let record = &manifest.records[0];
        assert_eq!(record.year_published, Some(1815));
        assert_eq!(record.rating, Some(4));
        assert!(record.is_read);
        assert!(record.authors.is_empty());
    }

    #[test]
    fn test_bad_values_skip_only_the_field() {
        let text = r#"{"books": [{
            "title": "Emma",
            "yearPublished": "eighteen fifteen",
            "rating": 9,
            "dateAdded": "yesterday",
            "publisher": "John Murray"
        }]}"#;

        let manifest = decode_manifest(text).unwrap();
        let record = &manifest.records[0];
        assert_eq!(record.year_published, None);
        assert_eq!(record.rating, None);
        assert_eq!(record.date_added, None);
        assert_eq!(record.publisher.as_deref(), Some("John Murray"));
    }

    #[test]
    fn test_untitled_entry_is_rejected_alone() {
        let text = r#"{"books": [{"title": ""}, {"title": "Emma"}, 42]}"#;

        let manifest = decode_manifest(text).unwrap();
        assert_eq!(manifest.records.len(), 1);
        assert_eq!(manifest.rejected.len(), 2);
        assert_eq!(manifest.entry_count(), 3);
    }

    #[test]
    fn test_missing_books_array() {
        let err = decode_manifest(r#"{"version": "2.0"}"#).unwrap_err();
        assert!(matches!(err, FormatError::MissingRecords));

        let err = decode_manifest("not a manifest").unwrap_err();
        assert!(matches!(err, FormatError::Malformed(_)));
    }

    #[test]
    fn test_brackets_inside_strings() {
        let text = r#"{"books": [{"title": "Arrays [] and {braces}", "authors": ["A ] B"]}]}"#;
        let manifest = decode_manifest(text).unwrap();
        assert_eq!(manifest.records[0].title, "Arrays [] and {braces}");
        assert_eq!(manifest.records[0].authors, vec!["A ] B"]);
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T10:30:00").is_some());
        assert!(parse_timestamp("2024-05-01T10:30:00.5").is_some());
        assert!(parse_timestamp("2024-05-01 10:30:00").is_some());
        assert!(parse_timestamp("May 1st").is_none());
    }

    proptest! {
        #[test]
        fn prop_string_fields_survive_encoding(title in any::<String>(), notes in any::<String>()) {
            prop_assume!(!title.trim().is_empty());
            prop_assume!(!notes.is_empty());

            let mut record = CatalogRecord::new(title.clone());
            record.notes = Some(notes.clone());
            record.authors = vec![title.clone()];

            let text = encode_manifest(&[record], fixed_time()).unwrap();
            let manifest = decode_manifest(&text).unwrap();

            prop_assert_eq!(&manifest.records[0].title, &title);
            prop_assert_eq!(manifest.records[0].notes.as_deref(), Some(notes.as_str()));
            prop_assert_eq!(&manifest.records[0].authors, &vec![title]);
        }
    }
}
