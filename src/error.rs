use std::path::PathBuf;
use thiserror::Error;

/// The main error type for maskpack operations.
#[derive(Debug, Error)]
pub enum MaskpackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed annotation {path}: {message}")]
    MalformedAnnotation { path: PathBuf, message: String },

    #[error("Cannot resolve {path}: {message}")]
    PathResolution { path: PathBuf, message: String },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid container {path}: {message}")]
    ContainerFormat { path: PathBuf, message: String },

    #[error("Container {path} declared {declared} row(s) but {written} were written")]
    AllocationSize {
        path: PathBuf,
        declared: usize,
        written: usize,
    },

    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown class label '{name}' in {path} (expected good, bad or none)")]
    UnknownClassLabel { path: PathBuf, name: String },

    #[error("Failed to parse {path}: {source}")]
    SideChannelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    SideChannelWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse layout file {path}: {source}")]
    LayoutParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Split mismatch: {message}")]
    SplitMismatch { message: String },

    #[error("{root} has {count} class directories; at most 128 fit an int8 label")]
    TooManyClasses { root: PathBuf, count: usize },

    #[error("No label.txt/size.txt entry for annotation reference '{key}'")]
    MissingDictionaryEntry { key: String },
}
