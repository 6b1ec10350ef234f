//! Annotation record types.
//!
//! The serde representations are positional so the side-channel files keep
//! the compact `[name, [xmin, ymin, xmax, ymax]]` / `[width, height]` shape.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in original-image pixel coordinates.
///
/// Parsed boxes satisfy `xmin < xmax <= width` and `ymin < ymax <= height`
/// for the record they belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    #[inline]
    pub fn new(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.xmax.saturating_sub(self.xmin)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.ymax.saturating_sub(self.ymin)
    }

    /// Returns true if the box is non-empty and fits inside `size`.
    pub fn fits(&self, size: ImageSize) -> bool {
        self.xmin < self.xmax
            && self.ymin < self.ymax
            && self.xmax <= size.width
            && self.ymax <= size.height
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from([xmin, ymin, xmax, ymax]: [u32; 4]) -> Self {
        Self::new(xmin, ymin, xmax, ymax)
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax]
    }
}

/// Image dimensions as declared by the annotation's `<size>` element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<[u32; 2]> for ImageSize {
    fn from([width, height]: [u32; 2]) -> Self {
        Self::new(width, height)
    }
}

impl From<ImageSize> for [u32; 2] {
    fn from(size: ImageSize) -> Self {
        [size.width, size.height]
    }
}

/// One labeled box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(String, BoundingBox)",
    into = "(String, BoundingBox)"
)]
pub struct AnnotatedObject {
    /// Class name exactly as written in `<name>`.
    pub name: String,
    pub bbox: BoundingBox,
}

impl AnnotatedObject {
    pub fn new(name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            name: name.into(),
            bbox,
        }
    }
}

impl From<(String, BoundingBox)> for AnnotatedObject {
    fn from((name, bbox): (String, BoundingBox)) -> Self {
        Self { name, bbox }
    }
}

impl From<AnnotatedObject> for (String, BoundingBox) {
    fn from(object: AnnotatedObject) -> Self {
        (object.name, object.bbox)
    }
}

/// A parsed annotation file.
///
/// `objects` keeps document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub size: ImageSize,
    pub objects: Vec<AnnotatedObject>,
}
