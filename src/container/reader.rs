//! Read-only container access.
//!
//! The `data` array is memory-mapped; labels are decoded at open. A
//! [`Container`] is `Send + Sync` and every accessor takes `&self`, so one
//! instance can serve concurrent readers.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use super::{LabelKind, RowLabel, RowShape, FORMAT_VERSION, HEADER_LEN, MAGIC};
use crate::error::MaskpackError;

/// An open container.
#[derive(Debug)]
pub struct Container {
    path: PathBuf,
    kind: LabelKind,
    shape: RowShape,
    data_offset: usize,
    labels: Vec<RowLabel>,
    mmap: Mmap,
}

impl Container {
    /// Open and validate the container at `path`.
    pub fn open(path: &Path) -> Result<Self, MaskpackError> {
        let file_len = fs::metadata(path).map_err(MaskpackError::Io)?.len();
        if file_len < HEADER_LEN {
            return Err(format_error(path, "file too small for a container header"));
        }

        let file = File::open(path).map_err(MaskpackError::Io)?;
        // SAFETY: containers are never modified in place; writers replace the
        // file wholesale by rename.
        let mmap = unsafe { MmapOptions::new().map(&file).map_err(MaskpackError::Io)? };
        let layout = parse_layout(path, &mmap[..])?;

        Ok(Self {
            path: path.to_path_buf(),
            kind: layout.kind,
            shape: layout.shape,
            data_offset: layout.data_offset,
            labels: layout.labels,
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label_kind(&self) -> LabelKind {
        self.kind
    }

    pub fn row_shape(&self) -> RowShape {
        self.shape
    }

    /// The whole `label` array, in row order.
    pub fn labels(&self) -> &[RowLabel] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Result<&RowLabel, MaskpackError> {
        self.labels.get(index).ok_or(MaskpackError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// Copy `data` row `index` out as HWC f32 values.
    pub fn row(&self, index: usize) -> Result<Vec<f32>, MaskpackError> {
        if index >= self.len() {
            return Err(MaskpackError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        let row_bytes = self.shape.byte_len() as usize;
        let start = self.data_offset + index * row_bytes;
        Ok(self.mmap[start..start + row_bytes]
            .chunks_exact(4)
            .map(|c| {
                let mut arr = [0u8; 4];
                arr.copy_from_slice(c);
                f32::from_le_bytes(arr)
            })
            .collect())
    }

    /// Row `index` of both arrays.
    pub fn get(&self, index: usize) -> Result<(Vec<f32>, RowLabel), MaskpackError> {
        let pixels = self.row(index)?;
        Ok((pixels, self.label(index)?.clone()))
    }
}

struct Layout {
    kind: LabelKind,
    shape: RowShape,
    data_offset: usize,
    labels: Vec<RowLabel>,
}

/// Validate the header and decode the label array of a whole container image.
fn parse_layout(path: &Path, data: &[u8]) -> Result<Layout, MaskpackError> {
    let file_len = data.len() as u64;
    if file_len < HEADER_LEN {
        return Err(format_error(path, "file too small for a container header"));
    }
    if &data[0..4] != MAGIC {
        return Err(format_error(path, "bad magic"));
    }
    let version = read_u32_le(&data[4..8]);
    if version != FORMAT_VERSION {
        return Err(format_error(
            path,
            format!("unsupported format version {version}"),
        ));
    }
    let kind_code = read_u32_le(&data[8..12]);
    let kind = LabelKind::from_code(kind_code)
        .ok_or_else(|| format_error(path, format!("unknown label kind {kind_code}")))?;
    let shape = RowShape {
        width: read_u32_le(&data[12..16]),
        height: read_u32_le(&data[16..20]),
        channels: read_u32_le(&data[20..24]),
    };
    let rows = read_u64_le(&data[24..32]);
    let data_offset = read_u64_le(&data[32..40]);
    let label_offset = read_u64_le(&data[40..48]);
    let label_len = read_u64_le(&data[48..56]);

    let data_bytes = (shape.width as u64)
        .checked_mul(shape.height as u64)
        .and_then(|n| n.checked_mul(shape.channels as u64))
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_mul(rows))
        .ok_or_else(|| format_error(path, "overflow computing data size"))?;
    let data_end = data_offset
        .checked_add(data_bytes)
        .ok_or_else(|| format_error(path, "overflow computing data size"))?;
    let label_end = label_offset
        .checked_add(label_len)
        .ok_or_else(|| format_error(path, "overflow computing label size"))?;
    if data_offset < HEADER_LEN || data_end > label_offset || label_end > file_len {
        return Err(format_error(path, "container truncated"));
    }

    let rows = rows as usize;
    let label_bytes = &data[label_offset as usize..label_end as usize];
    let labels = decode_labels(path, kind, rows, label_bytes)?;

    Ok(Layout {
        kind,
        shape,
        data_offset: data_offset as usize,
        labels,
    })
}

/// Validate an in-memory container and return its row count.
#[cfg(feature = "fuzzing")]
pub fn validate_container_bytes(bytes: &[u8]) -> Result<usize, MaskpackError> {
    parse_layout(Path::new("<memory>"), bytes).map(|layout| layout.labels.len())
}

fn decode_labels(
    path: &Path,
    kind: LabelKind,
    rows: usize,
    bytes: &[u8],
) -> Result<Vec<RowLabel>, MaskpackError> {
    match kind {
        LabelKind::Class => {
            if bytes.len() != rows {
                return Err(format_error(
                    path,
                    format!("label array has {} byte(s) for {rows} row(s)", bytes.len()),
                ));
            }
            Ok(bytes.iter().map(|&b| RowLabel::Class(b as i8)).collect())
        }
        LabelKind::AnnotationRef => {
            let table_len = rows
                .checked_add(1)
                .and_then(|n| n.checked_mul(8))
                .filter(|&n| n <= bytes.len())
                .ok_or_else(|| format_error(path, "label offset table truncated"))?;
            let (table, blob) = bytes.split_at(table_len);
            let offsets: Vec<usize> = table
                .chunks_exact(8)
                .map(|c| read_u64_le(c) as usize)
                .collect();

            let mut labels = Vec::with_capacity(rows);
            for (row, pair) in offsets.windows(2).enumerate() {
                let (start, end) = (pair[0], pair[1]);
                if start > end || end > blob.len() {
                    return Err(format_error(
                        path,
                        format!("label {row} offsets {start}..{end} out of bounds"),
                    ));
                }
                let key = std::str::from_utf8(&blob[start..end]).map_err(|source| {
                    format_error(path, format!("label {row} is not valid UTF-8: {source}"))
                })?;
                labels.push(RowLabel::AnnotationRef(key.to_string()));
            }
            Ok(labels)
        }
    }
}

fn format_error(path: &Path, message: impl Into<String>) -> MaskpackError {
    MaskpackError::ContainerFormat {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn read_u32_le(data: &[u8]) -> u32 {
    let mut arr = [0u8; 4];
    arr.copy_from_slice(data);
    u32::from_le_bytes(arr)
}

fn read_u64_le(data: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(data);
    u64::from_le_bytes(arr)
}
