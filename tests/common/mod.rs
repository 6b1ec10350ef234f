#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use maskpack::config::{ConvertOptions, DatasetLayout, DetectionSplit};

/// Write a solid-colour image; the format follows the extension.
pub fn write_image(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    RgbImage::from_pixel(width, height, Rgb(color))
        .save(path)
        .expect("write image file");
}

/// Two-tone image: left half `left`, right half `right`.
pub fn write_split_image(path: &Path, width: u32, height: u32, left: [u8; 3], right: [u8; 3]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb(left)
        } else {
            Rgb(right)
        }
    })
    .save(path)
    .expect("write image file");
}

pub fn voc_xml(width: u32, height: u32, objects: &[(&str, [u32; 4])]) -> String {
    let mut xml = format!(
        "<annotation>\n  <folder>images</folder>\n  <size>\n    <width>{width}</width>\n    <height>{height}</height>\n    <depth>3</depth>\n  </size>\n"
    );
    for (name, [xmin, ymin, xmax, ymax]) in objects {
        xml.push_str(&format!(
            "  <object>\n    <name>{name}</name>\n    <pose>Unspecified</pose>\n    <bndbox>\n      <xmin>{xmin}</xmin>\n      <ymin>{ymin}</ymin>\n      <xmax>{xmax}</xmax>\n      <ymax>{ymax}</ymax>\n    </bndbox>\n  </object>\n"
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}

pub fn write_annotation(path: &Path, width: u32, height: u32, objects: &[(&str, [u32; 4])]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, voc_xml(width, height, objects)).expect("write annotation file");
}

/// `<split_dir>/<class>/<n>.png` for every class, `per_class` images each.
pub fn write_classification_split(split_dir: &Path, classes: &[&str], per_class: usize) {
    for (label, class) in classes.iter().enumerate() {
        let shade = (label as u8).wrapping_mul(80);
        for idx in 0..per_class {
            write_image(
                &split_dir.join(class).join(format!("{idx}.png")),
                32 + idx as u32,
                24,
                [shade, 100, 200],
            );
        }
    }
}

/// One detection image with its annotation.
pub struct DetectionImage<'a> {
    pub name: &'a str,
    pub width: u32,
    pub height: u32,
    pub objects: &'a [(&'a str, [u32; 4])],
}

pub fn write_detection_set(layout: &DatasetLayout, images: &[DetectionImage<'_>]) {
    for image in images {
        write_image(
            &layout.detection_images_dir.join(image.name),
            image.width,
            image.height,
            [30, 60, 90],
        );
        let stem = Path::new(image.name)
            .file_stem()
            .expect("image stem")
            .to_string_lossy()
            .to_string();
        write_annotation(
            &layout.detection_labels_dir.join(format!("{stem}.xml")),
            image.width,
            image.height,
            image.objects,
        );
    }
}

/// Conversion options whose detection split fits `train + test` images.
pub fn convert_options(train: usize, test: usize) -> ConvertOptions {
    ConvertOptions {
        seed: Some(17),
        detection_split: DetectionSplit { train, test },
    }
}
