//! Packed sample container.
//!
//! A container holds two parallel arrays: `data`, one f32 row of
//! `width * height * channels` elements per sample, and `label`, one entry per
//! sample. Row `i` of both refers to the same source sample and row order is
//! fixed when the container is written.
//!
//! # File layout (little-endian)
//!
//! ```text
//! offset  size  field
//!      0     4  magic "MPK1"
//!      4     4  format version (1)
//!      8     4  label kind (0 = int8 class, 1 = annotation reference)
//!     12     4  width
//!     16     4  height
//!     20     4  channels
//!     24     8  rows
//!     32     8  data offset
//!     40     8  label offset
//!     48     8  label byte length
//!     56     8  reserved (0)
//! ```
//!
//! Class labels are one byte per row. Annotation references are a table of
//! `rows + 1` u64 offsets into a UTF-8 blob that follows the table.

mod reader;
mod writer;

pub use reader::Container;
#[cfg(feature = "fuzzing")]
pub use reader::validate_container_bytes;
pub use writer::ContainerWriter;

pub(crate) const MAGIC: &[u8; 4] = b"MPK1";
pub(crate) const FORMAT_VERSION: u32 = 1;
pub(crate) const HEADER_LEN: u64 = 64;

/// What the `label` array stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelKind {
    /// One int8 class code per row.
    Class,
    /// One annotation-file reference per row.
    AnnotationRef,
}

impl LabelKind {
    pub(crate) fn code(self) -> u32 {
        match self {
            LabelKind::Class => 0,
            LabelKind::AnnotationRef => 1,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(LabelKind::Class),
            1 => Some(LabelKind::AnnotationRef),
            _ => None,
        }
    }
}

/// One entry of the `label` array.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RowLabel {
    Class(i8),
    AnnotationRef(String),
}

impl RowLabel {
    pub fn kind(&self) -> LabelKind {
        match self {
            RowLabel::Class(_) => LabelKind::Class,
            RowLabel::AnnotationRef(_) => LabelKind::AnnotationRef,
        }
    }

    pub fn as_class(&self) -> Option<i8> {
        match self {
            RowLabel::Class(code) => Some(*code),
            RowLabel::AnnotationRef(_) => None,
        }
    }

    pub fn as_annotation_ref(&self) -> Option<&str> {
        match self {
            RowLabel::Class(_) => None,
            RowLabel::AnnotationRef(key) => Some(key),
        }
    }
}

/// Shape of one `data` row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowShape {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl RowShape {
    /// The 224x224 RGB shape produced by [`crate::pixels`].
    pub fn packed() -> Self {
        Self {
            width: crate::pixels::TARGET_WIDTH,
            height: crate::pixels::TARGET_HEIGHT,
            channels: crate::pixels::CHANNELS as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn byte_len(&self) -> u64 {
        self.len() as u64 * std::mem::size_of::<f32>() as u64
    }
}
