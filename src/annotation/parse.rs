//! XML annotation parser.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use super::model::{AnnotatedObject, AnnotationRecord, BoundingBox, ImageSize};
use crate::error::MaskpackError;

/// Parse the annotation file at `path`.
///
/// A missing file is reported as [`MaskpackError::PathResolution`], since the
/// path was derived from an image name and never checked before this point.
pub fn parse_annotation_file(path: &Path) -> Result<AnnotationRecord, MaskpackError> {
    let xml = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => MaskpackError::PathResolution {
            path: path.to_path_buf(),
            message: "annotation file does not exist".to_string(),
        },
        _ => MaskpackError::Io(source),
    })?;
    parse_annotation_xml(&xml, path)
}

/// Parse an annotation document from a UTF-8 string.
pub fn from_annotation_str(xml: &str) -> Result<AnnotationRecord, MaskpackError> {
    parse_annotation_xml(xml, Path::new("<memory>"))
}

/// Parse an annotation document from bytes.
///
/// The input must be valid UTF-8.
pub fn from_annotation_slice(bytes: &[u8]) -> Result<AnnotationRecord, MaskpackError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| MaskpackError::MalformedAnnotation {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_annotation_str(xml)
}

fn parse_annotation_xml(xml: &str, path: &Path) -> Result<AnnotationRecord, MaskpackError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|source| MaskpackError::MalformedAnnotation {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(malformed(path, "missing <annotation> root element"));
    }

    let size_node = required_child_element(annotation, "size", path, "<annotation>")?;
    let width = parse_required_u32(size_node, "width", path, "<size>")?;
    let height = parse_required_u32(size_node, "height", path, "<size>")?;
    if width == 0 || height == 0 {
        return Err(malformed(
            path,
            format!("image size {width}x{height} must be non-zero"),
        ));
    }
    let size = ImageSize::new(width, height);

    // A lone <object> and a run of them both come out of this loop as a
    // sequence, in document order.
    let mut objects = Vec::new();
    for (idx, object) in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
        .enumerate()
    {
        let name = required_child_text(object, "name", path, "<object>")?;
        let bndbox = required_child_element(object, "bndbox", path, "<object>")?;

        let bbox = BoundingBox::new(
            parse_required_u32(bndbox, "xmin", path, "<bndbox>")?,
            parse_required_u32(bndbox, "ymin", path, "<bndbox>")?,
            parse_required_u32(bndbox, "xmax", path, "<bndbox>")?,
            parse_required_u32(bndbox, "ymax", path, "<bndbox>")?,
        );

        if !bbox.fits(size) {
            return Err(malformed(
                path,
                format!(
                    "object {idx} ('{name}') box ({}, {}, {}, {}) must satisfy 0 <= xmin < xmax <= {width} and 0 <= ymin < ymax <= {height}",
                    bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax
                ),
            ));
        }

        objects.push(AnnotatedObject::new(name, bbox));
    }

    Ok(AnnotationRecord { size, objects })
}

fn malformed(path: &Path, message: impl Into<String>) -> MaskpackError {
    MaskpackError::MalformedAnnotation {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, MaskpackError> {
    child_element(node, tag).ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, MaskpackError> {
    optional_child_text(node, tag)
        .ok_or_else(|| malformed(path, format!("missing <{tag}> in {context}")))
}

fn parse_required_u32(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<u32, MaskpackError> {
    let raw = required_child_text(node, tag, path, context)?;
    raw.parse::<u32>().map_err(|_| {
        malformed(
            path,
            format!("invalid <{tag}> value '{raw}' in {context}; expected non-negative integer"),
        )
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}
