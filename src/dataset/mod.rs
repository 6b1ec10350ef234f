//! Random-access datasets over packed containers.
//!
//! A [`PackedDataset`] wraps one container. Detection datasets also hold the
//! label and size dictionaries and answer `get` with the full annotation
//! record instead of the raw reference. Transforms are injected and run on
//! every `get`, never at open.
//!
//! [`load_dataset`] resolves the named train/test pair:
//!
//! | name            | train                        | test                        |
//! |-----------------|------------------------------|-----------------------------|
//! | `single_person` | train container, augmented   | test container, normalized  |
//! | `detection`     | fixed-count random partition | rest of the partition       |
//! | `cropped`       | `n - n / 5` rows, raw pixels | `n / 5` rows, raw pixels    |

mod split;

pub use split::{cropped_split_lengths, random_split, split_dataset, Subset};

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use log::info;
use rand::{rngs::StdRng, RngExt, SeedableRng};

use crate::annotation::dictionary::{lookup_record, read_label_dictionary, read_size_dictionary};
use crate::annotation::{AnnotationRecord, LabelDictionary, SizeDictionary};
use crate::config::{DatasetLayout, LoadOptions};
use crate::container::{Container, LabelKind, RowLabel};
use crate::error::MaskpackError;
use crate::transform::{
    classification_test_transform, classification_train_transform, detection_transform,
    ImageTensor, Transform,
};

/// Anything that can hand out samples by index.
///
/// Implementations are shared across threads; `get` takes `&self` and keeps
/// no state between calls.
pub trait Dataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Sample, MaskpackError>;
}

/// What a sample is labeled with.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Class(i8),
    Detection {
        /// The reference stored in the container row.
        key: String,
        record: AnnotationRecord,
    },
}

/// One transformed image and its target.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub image: ImageTensor,
    pub target: Target,
}

enum Labels {
    Class,
    Detection {
        labels: LabelDictionary,
        sizes: SizeDictionary,
    },
}

/// A dataset backed by one container.
pub struct PackedDataset {
    container: Container,
    labels: Labels,
    transform: Option<Arc<dyn Transform>>,
    seed: Option<u64>,
}

impl PackedDataset {
    /// Wrap a container of class labels.
    pub fn classification(container: Container) -> Result<Self, MaskpackError> {
        expect_kind(&container, LabelKind::Class)?;
        Ok(Self {
            container,
            labels: Labels::Class,
            transform: None,
            seed: None,
        })
    }

    /// Wrap a container of annotation references and the dictionaries that
    /// resolve them. Every referenced key must be present in both.
    pub fn detection(
        container: Container,
        labels: LabelDictionary,
        sizes: SizeDictionary,
    ) -> Result<Self, MaskpackError> {
        expect_kind(&container, LabelKind::AnnotationRef)?;
        for label in container.labels() {
            if let Some(key) = label.as_annotation_ref() {
                if !labels.contains_key(key) || !sizes.contains_key(key) {
                    return Err(MaskpackError::MissingDictionaryEntry {
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(Self {
            container,
            labels: Labels::Detection { labels, sizes },
            transform: None,
            seed: None,
        })
    }

    pub fn open_classification(path: &Path) -> Result<Self, MaskpackError> {
        Self::classification(Container::open(path)?)
    }

    pub fn open_detection(
        path: &Path,
        label_dict: &Path,
        size_dict: &Path,
    ) -> Result<Self, MaskpackError> {
        let container = Container::open(path)?;
        let labels = read_label_dictionary(label_dict)?;
        let sizes = read_size_dictionary(size_dict)?;
        Self::detection(container, labels, sizes)
    }

    /// Run `transform` on every retrieved image.
    pub fn with_transform<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Seed per-sample augmentation. Sample `i` then always sees the same
    /// random draws.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    fn sample_rng(&self, index: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::seed_from_u64(rand::rng().random::<u64>()),
        }
    }

    fn target(&self, label: RowLabel) -> Result<Target, MaskpackError> {
        match (&self.labels, label) {
            (Labels::Class, RowLabel::Class(code)) => Ok(Target::Class(code)),
            (Labels::Detection { labels, sizes }, RowLabel::AnnotationRef(key)) => {
                let record = lookup_record(labels, sizes, &key)?;
                Ok(Target::Detection { key, record })
            }
            (_, label) => Err(MaskpackError::ContainerFormat {
                path: self.container.path().to_path_buf(),
                message: format!("unexpected label {label:?}"),
            }),
        }
    }
}

impl Dataset for PackedDataset {
    fn len(&self) -> usize {
        self.container.len()
    }

    fn get(&self, index: usize) -> Result<Sample, MaskpackError> {
        let (row, label) = self.container.get(index)?;
        let mut image = ImageTensor::from_hwc(&row, self.container.row_shape());
        if let Some(transform) = &self.transform {
            let mut rng = self.sample_rng(index);
            image = transform.apply(image, &mut rng);
        }
        Ok(Sample {
            image,
            target: self.target(label)?,
        })
    }
}

fn expect_kind(container: &Container, kind: LabelKind) -> Result<(), MaskpackError> {
    if container.label_kind() == kind {
        Ok(())
    } else {
        Err(MaskpackError::ContainerFormat {
            path: container.path().to_path_buf(),
            message: format!(
                "expected {kind:?} labels, found {:?}",
                container.label_kind()
            ),
        })
    }
}

/// The dataset names accepted by [`load_dataset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetKind {
    SinglePerson,
    Detection,
    Cropped,
}

impl DatasetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::SinglePerson => "single_person",
            DatasetKind::Detection => "detection",
            DatasetKind::Cropped => "cropped",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_person" => Ok(DatasetKind::SinglePerson),
            "detection" => Ok(DatasetKind::Detection),
            "cropped" => Ok(DatasetKind::Cropped),
            other => Err(format!("dataset {other} is not defined!")),
        }
    }
}

/// A train/test pair.
#[derive(Clone)]
pub struct DatasetSplits {
    pub train: Arc<dyn Dataset>,
    pub test: Arc<dyn Dataset>,
}

/// Open the train/test pair for `kind` from `layout`.
pub fn load_dataset(
    kind: DatasetKind,
    layout: &DatasetLayout,
    opts: &LoadOptions,
) -> Result<DatasetSplits, MaskpackError> {
    let splits = match kind {
        DatasetKind::SinglePerson => {
            let train = PackedDataset::open_classification(&layout.train_container)?
                .with_transform(classification_train_transform())
                .with_seed(opts.seed);
            let test = PackedDataset::open_classification(&layout.test_container)?
                .with_transform(classification_test_transform())
                .with_seed(opts.seed);
            DatasetSplits {
                train: Arc::new(train),
                test: Arc::new(test),
            }
        }
        DatasetKind::Detection => {
            let dataset = PackedDataset::open_detection(
                &layout.detection_container,
                &layout.label_dict,
                &layout.size_dict,
            )?
            .with_transform(detection_transform())
            .with_seed(opts.seed);
            let lengths = [opts.detection_split.train, opts.detection_split.test];
            partition(Arc::new(dataset), &lengths, opts.seed)?
        }
        DatasetKind::Cropped => {
            let dataset = PackedDataset::open_classification(&layout.cropped_container)?;
            let (train, test) = cropped_split_lengths(dataset.len());
            partition(Arc::new(dataset), &[train, test], opts.seed)?
        }
    };

    info!(
        "Loaded {kind}: {} train / {} test sample(s)",
        splits.train.len(),
        splits.test.len()
    );
    Ok(splits)
}

/// Resolve `name` and load it, printing a diagnostic for unknown names.
pub fn load_dataset_by_name(
    name: &str,
    layout: &DatasetLayout,
    opts: &LoadOptions,
) -> Result<Option<DatasetSplits>, MaskpackError> {
    match name.parse::<DatasetKind>() {
        Ok(kind) => load_dataset(kind, layout, opts).map(Some),
        Err(message) => {
            println!("{message}");
            Ok(None)
        }
    }
}

fn partition(
    dataset: Arc<dyn Dataset>,
    lengths: &[usize; 2],
    seed: Option<u64>,
) -> Result<DatasetSplits, MaskpackError> {
    let mut subsets = split_dataset(dataset, lengths, seed)?.into_iter();
    match (subsets.next(), subsets.next()) {
        (Some(train), Some(test)) => Ok(DatasetSplits {
            train: Arc::new(train),
            test: Arc::new(test),
        }),
        _ => Err(MaskpackError::SplitMismatch {
            message: "expected a train and a test subset".to_string(),
        }),
    }
}
