//! Manifest encode/decode benchmarks

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use homelib_core::archive::{asset_reference, decode_manifest, encode_manifest};
use homelib_core::CatalogRecord;
use std::hint::black_box;

fn sample_records(count: usize) -> Vec<CatalogRecord> {
    (0..count)
        .map(|i| {
            let mut record = CatalogRecord::new(format!("Book \"{}\"\nVolume {}", i, i % 7));
            record.isbn13 = Some(format!("978{:010}", i));
            record.publisher = Some("Ace Books".to_string());
            record.year_published = Some(1950 + (i % 70) as i32);
            record.tags = Some("fiction, classics".to_string());
            record.category = Some("Science Fiction".to_string());
            record.cover_image_path = Some(asset_reference(&format!("{}.jpg", i)));
            record.authors = vec!["Frank Herbert".to_string(), "Brian Herbert".to_string()];
            record
        })
        .collect()
}

fn manifest_benchmark(c: &mut Criterion) {
    let records = sample_records(2_000);
    let export_date = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap();
    let text = encode_manifest(&records, export_date).unwrap();

    c.bench_function("encode_manifest_2000", |b| {
        b.iter(|| encode_manifest(black_box(&records), export_date).unwrap())
    });

    c.bench_function("decode_manifest_2000", |b| {
        b.iter(|| decode_manifest(black_box(&text)).unwrap())
    });
}

criterion_group!(benches, manifest_benchmark);
criterion_main!(benches);
