//! Image discovery for the classification and detection datasets.
//!
//! Listings are flat and sorted by file name so that any shuffle applied
//! afterwards is reproducible from its seed alone. Hidden entries (leading
//! `.`) are skipped.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use walkdir::WalkDir;

use crate::error::MaskpackError;

/// Extension of annotation files; everything else in the image directory is an image.
pub const ANNOTATION_EXTENSION: &str = "xml";

/// A detection image paired with the annotation path derived from its name.
///
/// The annotation path is not checked here; a missing file surfaces when the
/// annotation is parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionEntry {
    pub image_name: String,
    pub image_path: PathBuf,
    pub annotation_path: PathBuf,
}

impl DetectionEntry {
    /// The string stored in the detection label column and used as the
    /// dictionary key.
    pub fn annotation_key(&self) -> String {
        self.annotation_path.to_string_lossy().into_owned()
    }
}

/// A class subdirectory of a classification split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDirectory {
    /// Position of the directory in the sorted listing.
    pub label: i8,
    pub name: String,
    pub path: PathBuf,
}

/// An image and the class label of the directory it was found in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledImage {
    pub path: PathBuf,
    pub label: i8,
}

/// How pooled classification images are ordered before packing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolOrder {
    /// Class by class, each class in file-name order.
    Grouped,
    /// Grouped order, then shuffled. `None` seeds from OS entropy.
    Shuffled { seed: Option<u64> },
}

/// File names of all detection images in `images_dir`, sorted.
pub fn detection_image_names(images_dir: &Path) -> Result<Vec<String>, MaskpackError> {
    let names = list_entries(images_dir, EntryKind::File)?
        .into_iter()
        .filter(|path| !has_annotation_extension(path))
        .map(|path| file_name_string(&path))
        .collect();
    Ok(names)
}

/// Derive the annotation path for `image_name` inside `labels_dir`.
///
/// The image extension (`.png`, `.jpg`, `.jpeg`, ...) is replaced by `.xml`.
pub fn annotation_path_for(image_name: &str, labels_dir: &Path) -> Result<PathBuf, MaskpackError> {
    let stem = Path::new(image_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| MaskpackError::PathResolution {
            path: PathBuf::from(image_name),
            message: "image file name has no stem to derive an annotation name from".to_string(),
        })?;
    Ok(labels_dir.join(format!("{stem}.{ANNOTATION_EXTENSION}")))
}

/// Pair every detection image with its annotation path.
pub fn detection_entries(
    images_dir: &Path,
    labels_dir: &Path,
) -> Result<Vec<DetectionEntry>, MaskpackError> {
    detection_image_names(images_dir)?
        .into_iter()
        .map(|image_name| {
            let annotation_path = annotation_path_for(&image_name, labels_dir)?;
            Ok(DetectionEntry {
                image_path: images_dir.join(&image_name),
                image_name,
                annotation_path,
            })
        })
        .collect()
}

/// Immediate subdirectories of `root`, labeled by sorted position.
pub fn class_directories(root: &Path) -> Result<Vec<ClassDirectory>, MaskpackError> {
    let dirs = list_entries(root, EntryKind::Dir)?;
    if dirs.len() > i8::MAX as usize + 1 {
        return Err(MaskpackError::TooManyClasses {
            root: root.to_path_buf(),
            count: dirs.len(),
        });
    }

    Ok(dirs
        .into_iter()
        .enumerate()
        .map(|(idx, path)| ClassDirectory {
            label: idx as i8,
            name: file_name_string(&path),
            path,
        })
        .collect())
}

/// Pool the images of every class directory under `root`.
pub fn classification_images(
    root: &Path,
    order: PoolOrder,
) -> Result<Vec<LabeledImage>, MaskpackError> {
    let mut pooled = Vec::new();
    for class in class_directories(root)? {
        let files = list_entries(&class.path, EntryKind::File)?;
        debug!(
            "class '{}' -> label {} ({} image(s))",
            class.name,
            class.label,
            files.len()
        );
        pooled.extend(files.into_iter().map(|path| LabeledImage {
            path,
            label: class.label,
        }));
    }

    if let PoolOrder::Shuffled { seed } = order {
        if let Some(seed) = seed {
            let mut rng = StdRng::seed_from_u64(seed);
            pooled.shuffle(&mut rng);
        } else {
            let mut rng = rand::rng();
            pooled.shuffle(&mut rng);
        }
    }

    Ok(pooled)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
}

fn list_entries(dir: &Path, kind: EntryKind) -> Result<Vec<PathBuf>, MaskpackError> {
    let mut entries = Vec::new();
    let mut skipped_dirs = 0usize;

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| MaskpackError::PathResolution {
            path: dir.to_path_buf(),
            message: format!("failed while listing directory: {source}"),
        })?;

        if is_hidden(entry.path()) {
            continue;
        }

        let file_type = entry.file_type();
        match kind {
            EntryKind::File if file_type.is_file() => entries.push(entry.into_path()),
            EntryKind::File if file_type.is_dir() => skipped_dirs += 1,
            EntryKind::Dir if file_type.is_dir() => entries.push(entry.into_path()),
            _ => {}
        }
    }

    if skipped_dirs > 0 {
        warn!(
            "{} is scanned flat; skipping {} subdirector(ies)",
            dir.display(),
            skipped_dirs
        );
    }

    Ok(entries)
}

fn has_annotation_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(ANNOTATION_EXTENSION))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, b"").expect("write file");
    }

    #[test]
    fn annotation_path_replaces_any_extension() {
        let labels = Path::new("labels");
        assert_eq!(
            annotation_path_for("a.png", labels).unwrap(),
            PathBuf::from("labels/a.xml")
        );
        assert_eq!(
            annotation_path_for("photo.jpeg", labels).unwrap(),
            PathBuf::from("labels/photo.xml")
        );
        assert_eq!(
            annotation_path_for("maksssksksss12.jpg", labels).unwrap(),
            PathBuf::from("labels/maksssksksss12.xml")
        );
    }

    #[test]
    fn detection_listing_skips_xml_and_hidden_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        touch(&images.join("b.png"));
        touch(&images.join("a.jpeg"));
        touch(&images.join("a.xml"));
        touch(&images.join(".DS_Store"));
        touch(&images.join("nested/c.png"));

        let names = detection_image_names(&images).expect("list images");
        assert_eq!(names, vec!["a.jpeg".to_string(), "b.png".to_string()]);
    }

    #[test]
    fn detection_entries_do_not_require_annotation_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        let labels = temp.path().join("labels");
        touch(&images.join("x.png"));

        let entries = detection_entries(&images, &labels).expect("index");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].image_path, images.join("x.png"));
        assert_eq!(entries[0].annotation_path, labels.join("x.xml"));
        assert!(!entries[0].annotation_path.exists());
    }

    #[test]
    fn class_labels_follow_sorted_directory_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        touch(&temp.path().join("without_mask/1.png"));
        touch(&temp.path().join("with_mask/1.png"));
        touch(&temp.path().join("stray.txt"));

        let classes = class_directories(temp.path()).expect("list classes");
        let names: Vec<(&str, i8)> = classes.iter().map(|c| (c.name.as_str(), c.label)).collect();
        assert_eq!(names, vec![("with_mask", 0), ("without_mask", 1)]);
    }

    #[test]
    fn grouped_pool_keeps_class_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for class in ["a", "b"] {
            for idx in 0..3 {
                touch(&temp.path().join(format!("{class}/{idx}.png")));
            }
        }

        let pooled = classification_images(temp.path(), PoolOrder::Grouped).expect("pool");
        let labels: Vec<i8> = pooled.iter().map(|img| img.label).collect();
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn seeded_shuffle_is_reproducible_and_label_preserving() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for class in ["a", "b"] {
            for idx in 0..10 {
                touch(&temp.path().join(format!("{class}/{idx:02}.png")));
            }
        }

        let order = PoolOrder::Shuffled { seed: Some(7) };
        let first = classification_images(temp.path(), order).expect("pool");
        let second = classification_images(temp.path(), order).expect("pool");
        assert_eq!(first, second);

        let zeros = first.iter().filter(|img| img.label == 0).count();
        assert_eq!(zeros, 10);
        assert_eq!(first.len(), 20);
    }
}
