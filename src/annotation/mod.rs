//! Per-image detection annotations.
//!
//! An annotation file is a VOC-style XML document with an `<annotation>` root,
//! a `<size>` element and zero or more `<object>` elements. This module parses
//! those files into [`AnnotationRecord`]s and persists the label/size
//! dictionaries written next to the detection container.
//!
//! Box coordinates stay in original-image pixel space; nothing here rescales
//! them to the packed 224x224 resolution.

mod class;
pub mod dictionary;
mod model;
mod parse;

pub use class::MaskClass;
pub use dictionary::{LabelDictionary, SizeDictionary};
pub use model::{AnnotatedObject, AnnotationRecord, BoundingBox, ImageSize};
pub use parse::{from_annotation_slice, from_annotation_str, parse_annotation_file};
