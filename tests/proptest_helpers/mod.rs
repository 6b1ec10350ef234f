#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// An object whose box fits inside `width` x `height`.
#[derive(Clone, Debug, PartialEq)]
pub struct ArbObject {
    pub name: String,
    pub bbox: [u32; 4],
}

pub fn arb_class_name() -> BoxedStrategy<String> {
    prop_oneof![
        Just("good".to_string()),
        Just("bad".to_string()),
        Just("none".to_string()),
        "[a-z_]{1,12}",
    ]
    .boxed()
}

pub fn arb_object(width: u32, height: u32) -> BoxedStrategy<ArbObject> {
    (0..width, 0..height, arb_class_name())
        .prop_flat_map(move |(xmin, ymin, name)| {
            (
                Just(xmin),
                Just(ymin),
                (xmin + 1)..=width,
                (ymin + 1)..=height,
                Just(name),
            )
        })
        .prop_map(|(xmin, ymin, xmax, ymax, name)| ArbObject {
            name,
            bbox: [xmin, ymin, xmax, ymax],
        })
        .boxed()
}

/// `(width, height, objects)` for one annotation file.
pub fn arb_annotation(max_objects: usize) -> BoxedStrategy<(u32, u32, Vec<ArbObject>)> {
    (1u32..2000, 1u32..2000)
        .prop_flat_map(move |(width, height)| {
            (
                Just(width),
                Just(height),
                prop::collection::vec(arb_object(width, height), 0..=max_objects),
            )
        })
        .boxed()
}

pub fn annotation_xml(width: u32, height: u32, objects: &[ArbObject]) -> String {
    let mut xml = format!(
        "<annotation><size><width>{width}</width><height>{height}</height><depth>3</depth></size>"
    );
    for object in objects {
        let [xmin, ymin, xmax, ymax] = object.bbox;
        xml.push_str(&format!(
            "<object><name>{}</name><bndbox><xmin>{xmin}</xmin><ymin>{ymin}</ymin><xmax>{xmax}</xmax><ymax>{ymax}</ymax></bndbox></object>",
            object.name
        ));
    }
    xml.push_str("</annotation>");
    xml
}
