//! Criterion microbenches for maskpack's hot paths.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - annotation XML parsing (from_annotation_str, from_annotation_slice)
//! - row preparation (cubic resize + [0, 1] scaling)
//! - the classification train transform chain

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use image::{Rgb, RgbImage};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

use maskpack::annotation::{from_annotation_slice, from_annotation_str};
use maskpack::container::RowShape;
use maskpack::pixels::prepare_row;
use maskpack::transform::{classification_train_transform, ImageTensor, Transform};

// Inline annotation in the shape of the face-mask detection labels.
const ANNOTATION_FIXTURE: &str = r#"<annotation>
    <folder>images</folder>
    <filename>maksssksksss0.png</filename>
    <size>
        <width>512</width>
        <height>366</height>
        <depth>3</depth>
    </size>
    <segmented>0</segmented>
    <object>
        <name>none</name>
        <pose>Unspecified</pose>
        <truncated>0</truncated>
        <occluded>0</occluded>
        <difficult>0</difficult>
        <bndbox><xmin>79</xmin><ymin>105</ymin><xmax>109</xmax><ymax>142</ymax></bndbox>
    </object>
    <object>
        <name>good</name>
        <pose>Unspecified</pose>
        <truncated>0</truncated>
        <occluded>0</occluded>
        <difficult>0</difficult>
        <bndbox><xmin>185</xmin><ymin>100</ymin><xmax>226</xmax><ymax>144</ymax></bndbox>
    </object>
    <object>
        <name>bad</name>
        <pose>Unspecified</pose>
        <truncated>0</truncated>
        <occluded>0</occluded>
        <difficult>0</difficult>
        <bndbox><xmin>325</xmin><ymin>90</ymin><xmax>360</xmax><ymax>141</ymax></bndbox>
    </object>
</annotation>
"#;

/// Benchmark annotation parsing from string.
fn bench_annotation_parse_str(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotation_parse");
    group.throughput(Throughput::Bytes(ANNOTATION_FIXTURE.len() as u64));

    group.bench_function("from_annotation_str", |b| {
        b.iter(|| {
            let record = from_annotation_str(black_box(ANNOTATION_FIXTURE)).unwrap();
            black_box(record)
        })
    });

    group.finish();
}

/// Benchmark annotation parsing from byte slice.
fn bench_annotation_parse_slice(c: &mut Criterion) {
    let bytes = ANNOTATION_FIXTURE.as_bytes();
    let mut group = c.benchmark_group("annotation_parse");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("from_annotation_slice", |b| {
        b.iter(|| {
            let record = from_annotation_slice(black_box(bytes)).unwrap();
            black_box(record)
        })
    });

    group.finish();
}

/// Benchmark resizing a decoded image into a packed row.
fn bench_prepare_row(c: &mut Criterion) {
    let image = RgbImage::from_fn(512, 366, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));

    let mut group = c.benchmark_group("prepare_row");
    group.throughput(Throughput::Elements(1));

    group.bench_function("512x366_to_224x224", |b| {
        b.iter(|| {
            let row = prepare_row(black_box(&image));
            black_box(row)
        })
    });

    group.finish();
}

/// Benchmark the full train augmentation chain on one packed row.
fn bench_train_transform(c: &mut Criterion) {
    let row = vec![0.5f32; RowShape::packed().len()];
    let chain = classification_train_transform();

    let mut group = c.benchmark_group("transform");
    group.throughput(Throughput::Elements(1));

    group.bench_function("classification_train", |b| {
        let mut rng = StdRng::seed_from_u64(0);
        b.iter(|| {
            let image = ImageTensor::from_hwc(black_box(&row), RowShape::packed());
            black_box(chain.apply(image, &mut rng))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_annotation_parse_str,
    bench_annotation_parse_slice,
    bench_prepare_row,
    bench_train_transform,
);
criterion_main!(benches);
