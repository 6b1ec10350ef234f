//! Integration tests for the classification conversion passes.

mod common;

use maskpack::config::DatasetLayout;
use maskpack::container::{Container, LabelKind, RowLabel};
use maskpack::convert::{convert_classification, convert_test, convert_train};
use maskpack::index::PoolOrder;
use maskpack::pixels::ROW_LEN;
use maskpack::MaskpackError;

use common::{convert_options, write_classification_split, write_image};

fn class_codes(container: &Container) -> Vec<i8> {
    container
        .labels()
        .iter()
        .map(|label| label.as_class().expect("class label"))
        .collect()
}

#[test]
fn train_split_with_two_classes_packs_six_rows() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let layout = DatasetLayout::from_root(temp.path());
    write_classification_split(&layout.train_dir, &["with_mask", "without_mask"], 3);

    let summary = convert_train(&layout, &convert_options(0, 0)).expect("convert train");
    assert_eq!(summary.rows, 6);
    assert_eq!(summary.per_class, vec![3, 3]);

    let container = Container::open(&layout.train_container).expect("open train container");
    assert_eq!(container.len(), 6);
    assert_eq!(container.label_kind(), LabelKind::Class);

    let mut codes = class_codes(&container);
    codes.sort_unstable();
    assert_eq!(codes, vec![0, 0, 0, 1, 1, 1]);

    let row = container.row(5).expect("last row");
    assert_eq!(row.len(), ROW_LEN);
    assert!(row.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn seeded_train_conversion_is_reproducible() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let layout = DatasetLayout::from_root(temp.path());
    write_classification_split(&layout.train_dir, &["a", "b", "c"], 4);

    let opts = convert_options(0, 0);
    convert_train(&layout, &opts).expect("first run");
    let first = class_codes(&Container::open(&layout.train_container).expect("open"));
    convert_train(&layout, &opts).expect("second run");
    let second = class_codes(&Container::open(&layout.train_container).expect("open"));

    assert_eq!(first, second);
}

#[test]
fn test_split_keeps_class_grouping() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let layout = DatasetLayout::from_root(temp.path());
    write_classification_split(&layout.test_dir, &["good", "bad"], 2);

    convert_test(&layout).expect("convert test");
    let container = Container::open(&layout.test_container).expect("open test container");
    // Labels follow sorted directory names: bad = 0, good = 1.
    assert_eq!(class_codes(&container), vec![0, 0, 1, 1]);
}

#[test]
fn packed_pixels_are_rgb_scaled_to_unit_range() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let split = temp.path().join("split");
    write_image(&split.join("only/0.png"), 224, 224, [255, 0, 51]);

    let out = temp.path().join("out/packed.bin");
    convert_classification(&split, &out, PoolOrder::Grouped).expect("convert");

    let container = Container::open(&out).expect("open");
    let (row, label) = container.get(0).expect("row 0");
    assert_eq!(label, RowLabel::Class(0));
    assert!((row[0] - 1.0).abs() < 1e-6);
    assert!(row[1].abs() < 1e-6);
    assert!((row[2] - 0.2).abs() < 1e-6);
}

#[test]
fn undecodable_image_aborts_without_replacing_the_container() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let layout = DatasetLayout::from_root(temp.path());
    write_classification_split(&layout.test_dir, &["good"], 2);
    convert_test(&layout).expect("first conversion");
    let before = std::fs::read(&layout.test_container).expect("read container");

    std::fs::write(layout.test_dir.join("good/zz.png"), b"not a png").expect("write junk");
    let err = convert_test(&layout).unwrap_err();
    assert!(matches!(err, MaskpackError::ImageDecode { .. }), "{err}");

    let after = std::fs::read(&layout.test_container).expect("read container");
    assert_eq!(before, after);
}
