//! Filesystem layout and run options.
//!
//! [`DatasetLayout`] names every directory and file the conversion and load
//! steps touch. It is resolved once (from a root directory, optionally
//! overridden by a YAML file) and passed down, so nothing below this module
//! hard-codes a path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MaskpackError;

/// Default dataset root, relative to the working directory.
pub const DEFAULT_ROOT: &str = "dataset";

/// Where every dataset role lives on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLayout {
    /// `<train_dir>/<class>/*` classification images.
    pub train_dir: PathBuf,
    /// `<test_dir>/<class>/*` classification images.
    pub test_dir: PathBuf,
    pub detection_images_dir: PathBuf,
    /// One `.xml` per detection image, same base name.
    pub detection_labels_dir: PathBuf,
    pub train_container: PathBuf,
    pub test_container: PathBuf,
    pub detection_container: PathBuf,
    pub cropped_container: PathBuf,
    pub label_dict: PathBuf,
    pub size_dict: PathBuf,
}

impl DatasetLayout {
    /// The conventional layout under `root`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let packed = root.join("hdf5_detection");
        Self {
            train_dir: root.join("train"),
            test_dir: root.join("test"),
            detection_images_dir: root.join("detection").join("images"),
            detection_labels_dir: root.join("detection").join("labels"),
            train_container: root.join("hdf5_train").join("train.h5"),
            test_container: root.join("hdf5_test").join("test.h5"),
            detection_container: packed.join("detection.h5"),
            cropped_container: packed.join("cropped.h5"),
            label_dict: packed.join("label.txt"),
            size_dict: packed.join("size.txt"),
        }
    }

    /// Load a layout from a YAML file.
    ///
    /// Relative entries are resolved against the file's directory.
    pub fn from_yaml_file(path: &Path) -> Result<Self, MaskpackError> {
        let raw = fs::read_to_string(path).map_err(MaskpackError::Io)?;
        let layout: DatasetLayout =
            serde_yaml::from_str(&raw).map_err(|source| MaskpackError::LayoutParse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(layout.resolved_against(base))
    }

    fn resolved_against(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            train_dir: resolve(self.train_dir),
            test_dir: resolve(self.test_dir),
            detection_images_dir: resolve(self.detection_images_dir),
            detection_labels_dir: resolve(self.detection_labels_dir),
            train_container: resolve(self.train_container),
            test_container: resolve(self.test_container),
            detection_container: resolve(self.detection_container),
            cropped_container: resolve(self.cropped_container),
            label_dict: resolve(self.label_dict),
            size_dict: resolve(self.size_dict),
        }
    }
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self::from_root(DEFAULT_ROOT)
    }
}

/// Fixed train/test row counts for the detection split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSplit {
    pub train: usize,
    pub test: usize,
}

impl DetectionSplit {
    pub fn total(&self) -> usize {
        self.train + self.test
    }

    /// Fail unless the split covers exactly `images` rows.
    pub fn check(&self, images: usize) -> Result<(), MaskpackError> {
        if self.total() == images {
            Ok(())
        } else {
            Err(MaskpackError::SplitMismatch {
                message: format!(
                    "detection split {}+{}={} does not match {} detection image(s)",
                    self.train,
                    self.test,
                    self.total(),
                    images
                ),
            })
        }
    }
}

impl Default for DetectionSplit {
    fn default() -> Self {
        Self {
            train: 542,
            test: 135,
        }
    }
}

/// Options for the conversion passes.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    /// Seed for the train-split shuffle. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Checked against the detection image count before anything is written.
    pub detection_split: DetectionSplit,
}

/// Options for opening datasets.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Seed for the open-time partition and per-sample augmentation.
    pub seed: Option<u64>,
    pub detection_split: DetectionSplit,
}
