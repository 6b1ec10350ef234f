//! Conversion passes that build the packed containers from source images.
//!
//! Every pass runs sequentially and aborts on the first failing image. The
//! target container is only replaced once all of its rows have been written.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::annotation::dictionary::{write_label_dictionary, write_size_dictionary};
use crate::annotation::{parse_annotation_file, LabelDictionary, MaskClass, SizeDictionary};
use crate::config::{ConvertOptions, DatasetLayout};
use crate::container::{Container, ContainerWriter, LabelKind, RowLabel};
use crate::crop::{build_cropped, CropSummary};
use crate::error::MaskpackError;
use crate::index::{classification_images, detection_entries, PoolOrder};
use crate::pixels::load_row;

/// Conversion modes accepted by [`run_mode`].
pub const MODES: [&str; 4] = ["all", "train", "test", "detection"];

/// Outcome of a classification pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub path: PathBuf,
    pub rows: usize,
    /// Row count per class code.
    pub per_class: Vec<usize>,
}

/// Outcome of the detection pass, including the cropper it triggers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionSummary {
    pub path: PathBuf,
    pub rows: usize,
    /// Annotated objects across all images; the cropped container's row count.
    pub objects: usize,
    pub cropped: CropSummary,
}

/// Pack every image under `split_dir/<class>/` into one class-labeled container.
pub fn convert_classification(
    split_dir: &Path,
    container_path: &Path,
    order: PoolOrder,
) -> Result<ClassificationSummary, MaskpackError> {
    let images = classification_images(split_dir, order)?;
    info!(
        "Packing {} image(s) from {} into {}",
        images.len(),
        split_dir.display(),
        container_path.display()
    );

    let mut writer = ContainerWriter::create(container_path, LabelKind::Class, images.len())?;
    let mut per_class: Vec<usize> = Vec::new();
    for image in &images {
        let row = load_row(&image.path)?;
        let index = writer.push_row(&row, RowLabel::Class(image.label))?;
        debug!("row {index}: {} -> {}", image.path.display(), image.label);

        let code = image.label as usize;
        if per_class.len() <= code {
            per_class.resize(code + 1, 0);
        }
        per_class[code] += 1;
    }
    let path = writer.finish()?;

    info!("Wrote {} row(s) to {}", images.len(), path.display());
    Ok(ClassificationSummary {
        path,
        rows: images.len(),
        per_class,
    })
}

/// Train split: pooled and shuffled.
pub fn convert_train(
    layout: &DatasetLayout,
    opts: &ConvertOptions,
) -> Result<ClassificationSummary, MaskpackError> {
    convert_classification(
        &layout.train_dir,
        &layout.train_container,
        PoolOrder::Shuffled { seed: opts.seed },
    )
}

/// Test split: grouped by class, unshuffled.
pub fn convert_test(layout: &DatasetLayout) -> Result<ClassificationSummary, MaskpackError> {
    convert_classification(&layout.test_dir, &layout.test_container, PoolOrder::Grouped)
}

/// Pack the detection images, write both dictionaries, then build the
/// cropped container.
pub fn convert_detection(
    layout: &DatasetLayout,
    opts: &ConvertOptions,
) -> Result<DetectionSummary, MaskpackError> {
    let entries = detection_entries(&layout.detection_images_dir, &layout.detection_labels_dir)?;
    opts.detection_split.check(entries.len())?;

    info!(
        "Packing {} detection image(s) into {}",
        entries.len(),
        layout.detection_container.display()
    );

    let mut writer =
        ContainerWriter::create(&layout.detection_container, LabelKind::AnnotationRef, entries.len())?;
    let mut labels = LabelDictionary::new();
    let mut sizes = SizeDictionary::new();
    let mut objects = 0usize;

    for entry in &entries {
        let record = parse_annotation_file(&entry.annotation_path)?;
        // Class names are checked before any artifact is replaced.
        for object in &record.objects {
            MaskClass::from_name(&object.name, &entry.annotation_path)?;
        }
        let row = load_row(&entry.image_path)?;
        let key = entry.annotation_key();

        let index = writer.push_row(&row, RowLabel::AnnotationRef(key.clone()))?;
        debug!(
            "row {index}: {} ({} object(s))",
            entry.image_name,
            record.objects.len()
        );

        objects += record.objects.len();
        sizes.insert(key.clone(), record.size);
        labels.insert(key, record.objects);
    }
    let path = writer.finish()?;

    write_label_dictionary(&layout.label_dict, &labels)?;
    write_size_dictionary(&layout.size_dict, &sizes)?;
    info!(
        "Wrote {} row(s) and {} dictionary entr(ies); {} object(s) in total",
        entries.len(),
        labels.len(),
        objects
    );

    let detection = Container::open(&path)?;
    let cropped = build_cropped(
        &detection,
        &entries,
        &labels,
        objects,
        &layout.cropped_container,
    )?;

    Ok(DetectionSummary {
        path,
        rows: entries.len(),
        objects,
        cropped,
    })
}

/// Run the passes selected by `mode`.
///
/// Unrecognized modes print a diagnostic and do nothing. Returns `false` in
/// that case.
pub fn run_mode(
    mode: &str,
    layout: &DatasetLayout,
    opts: &ConvertOptions,
) -> Result<bool, MaskpackError> {
    if !MODES.contains(&mode) {
        println!("mode {mode} not defined!");
        return Ok(false);
    }
    match mode {
        "all" => {
            convert_train(layout, opts)?;
            convert_test(layout)?;
            convert_detection(layout, opts)?;
        }
        "train" => {
            convert_train(layout, opts)?;
        }
        "test" => {
            convert_test(layout)?;
        }
        // "detection"
        _ => {
            convert_detection(layout, opts)?;
        }
    }
    Ok(true)
}
