//! Per-object crops of the detection images.
//!
//! The cropped container holds one row per annotated object. Rows follow the
//! detection container's row order, then the object order inside each
//! annotation. Crops are cut from the original decoded image, not from the
//! packed 224x224 row.

use std::path::{Path, PathBuf};

use image::imageops;
use log::{debug, info, warn};

use crate::annotation::{BoundingBox, LabelDictionary, MaskClass};
use crate::container::{Container, ContainerWriter, LabelKind, RowLabel};
use crate::error::MaskpackError;
use crate::index::DetectionEntry;
use crate::pixels::{open_rgb, resize_cubic, to_unit_row, TARGET_HEIGHT, TARGET_WIDTH};

/// Outcome of a cropping pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CropSummary {
    pub path: PathBuf,
    pub rows: usize,
    /// Rows per class code, indexed by [`MaskClass::code`].
    pub per_class: [usize; 3],
}

/// Build the cropped container at `out_path`.
///
/// `entries` are the images the detection container was written from, so row
/// `i` is cropped from `entries[i]`. `target_rows` is the object count
/// gathered while the detection container was written.
pub fn build_cropped(
    detection: &Container,
    entries: &[DetectionEntry],
    labels: &LabelDictionary,
    target_rows: usize,
    out_path: &Path,
) -> Result<CropSummary, MaskpackError> {
    if detection.label_kind() != LabelKind::AnnotationRef {
        return Err(MaskpackError::ContainerFormat {
            path: detection.path().to_path_buf(),
            message: "cropping needs a container of annotation references".to_string(),
        });
    }

    if entries.len() != detection.len() {
        return Err(MaskpackError::ContainerFormat {
            path: detection.path().to_path_buf(),
            message: format!(
                "{} detection row(s) but {} image(s) to crop from",
                detection.len(),
                entries.len()
            ),
        });
    }

    info!(
        "Cropping {} object(s) from {} image(s) into {}",
        target_rows,
        detection.len(),
        out_path.display()
    );

    let mut writer = ContainerWriter::create(out_path, LabelKind::Class, target_rows)?;
    let mut per_class = [0usize; 3];

    for (label, entry) in detection.labels().iter().zip(entries) {
        let key = match label {
            RowLabel::AnnotationRef(key) => key.as_str(),
            RowLabel::Class(_) => continue,
        };
        if entry.annotation_key() != key {
            return Err(MaskpackError::PathResolution {
                path: entry.image_path.clone(),
                message: format!("detection row refers to {key}, not to this image's annotation"),
            });
        }
        let objects = labels
            .get(key)
            .ok_or_else(|| MaskpackError::MissingDictionaryEntry {
                key: key.to_string(),
            })?;
        let image_path = entry.image_path.as_path();

        // Resolve every class before decoding so a bad label fails fast.
        let annotation_path = Path::new(key);
        let classes = objects
            .iter()
            .map(|object| MaskClass::from_name(&object.name, annotation_path))
            .collect::<Result<Vec<_>, _>>()?;

        let source = open_rgb(image_path)?;
        for (object, class) in objects.iter().zip(classes) {
            let (x, y, w, h) = clamp_box(&object.bbox, source.dimensions(), annotation_path)?;
            let crop = imageops::crop_imm(&source, x, y, w, h).to_image();
            let resized = resize_cubic(&crop, TARGET_WIDTH, TARGET_HEIGHT);
            let index = writer.push_row(&to_unit_row(&resized), RowLabel::Class(class.code()))?;
            per_class[class.code() as usize] += 1;
            debug!("crop {index}: {class} from {}", image_path.display());
        }
    }

    let path = writer.finish()?;
    info!(
        "Wrote {} crop(s) (good {}, bad {}, none {})",
        target_rows, per_class[0], per_class[1], per_class[2]
    );
    Ok(CropSummary {
        path,
        rows: target_rows,
        per_class,
    })
}

/// Clamp `bbox` to the decoded image and return `(x, y, width, height)`.
///
/// Annotated sizes occasionally disagree with the decoded image; boxes are cut
/// back to the pixels that exist and only an empty result is an error.
fn clamp_box(
    bbox: &BoundingBox,
    (width, height): (u32, u32),
    source: &Path,
) -> Result<(u32, u32, u32, u32), MaskpackError> {
    let xmin = bbox.xmin.min(width);
    let ymin = bbox.ymin.min(height);
    let xmax = bbox.xmax.min(width);
    let ymax = bbox.ymax.min(height);

    if xmin >= xmax || ymin >= ymax {
        return Err(MaskpackError::MalformedAnnotation {
            path: source.to_path_buf(),
            message: format!(
                "box ({}, {}, {}, {}) lies outside the decoded {}x{} image",
                bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax, width, height
            ),
        });
    }
    if (xmin, ymin, xmax, ymax) != (bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax) {
        warn!(
            "{}: box ({}, {}, {}, {}) clamped to the decoded {}x{} image",
            source.display(),
            bbox.xmin,
            bbox.ymin,
            bbox.xmax,
            bbox.ymax,
            width,
            height
        );
    }
    Ok((xmin, ymin, xmax - xmin, ymax - ymin))
}
