//! Container writer.
//!
//! Rows are written into a temporary file next to the target. The target is
//! only replaced once every declared row has been written, so an aborted run
//! leaves any previous container untouched.

use std::fs;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use super::{LabelKind, RowLabel, RowShape, FORMAT_VERSION, HEADER_LEN, MAGIC};
use crate::error::MaskpackError;

/// Builds one container with a row count fixed up front.
#[derive(Debug)]
pub struct ContainerWriter {
    path: PathBuf,
    file: NamedTempFile,
    kind: LabelKind,
    shape: RowShape,
    rows: usize,
    labels: Vec<Option<RowLabel>>,
    next: usize,
}

impl ContainerWriter {
    /// Start a container of `rows` packed 224x224 RGB rows at `path`.
    pub fn create(path: &Path, kind: LabelKind, rows: usize) -> Result<Self, MaskpackError> {
        Self::create_with_shape(path, kind, rows, RowShape::packed())
    }

    /// Start a container with an explicit row shape.
    pub fn create_with_shape(
        path: &Path,
        kind: LabelKind,
        rows: usize,
        shape: RowShape,
    ) -> Result<Self, MaskpackError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(MaskpackError::Io)?;

        let file = NamedTempFile::new_in(&parent).map_err(MaskpackError::Io)?;
        file.as_file()
            .set_len(HEADER_LEN + rows as u64 * shape.byte_len())
            .map_err(MaskpackError::Io)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            kind,
            shape,
            rows,
            labels: vec![None; rows],
            next: 0,
        })
    }

    /// Declared row count.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rows written so far.
    pub fn written(&self) -> usize {
        self.labels.iter().filter(|label| label.is_some()).count()
    }

    /// Write the next row in sequence.
    pub fn push_row(&mut self, pixels: &[f32], label: RowLabel) -> Result<usize, MaskpackError> {
        let index = self.next;
        self.write_row(index, pixels, label)?;
        self.next = index + 1;
        Ok(index)
    }

    /// Write row `index`.
    ///
    /// Rows may arrive in any order; their position is the index, not the
    /// arrival order.
    pub fn write_row(
        &mut self,
        index: usize,
        pixels: &[f32],
        label: RowLabel,
    ) -> Result<(), MaskpackError> {
        if index >= self.rows {
            return Err(MaskpackError::AllocationSize {
                path: self.path.clone(),
                declared: self.rows,
                written: self.written(),
            });
        }
        if pixels.len() != self.shape.len() {
            return Err(self.format_error(format!(
                "row {index} has {} element(s); expected {}",
                pixels.len(),
                self.shape.len()
            )));
        }
        if label.kind() != self.kind {
            return Err(self.format_error(format!(
                "row {index} label {label:?} does not match container label kind {:?}",
                self.kind
            )));
        }
        if self.labels[index].is_some() {
            return Err(self.format_error(format!("row {index} written twice")));
        }

        let mut bytes = Vec::with_capacity(self.shape.byte_len() as usize);
        for value in pixels {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let offset = HEADER_LEN + index as u64 * self.shape.byte_len();
        let file = self.file.as_file_mut();
        file.seek(SeekFrom::Start(offset))
            .map_err(MaskpackError::Io)?;
        file.write_all(&bytes).map_err(MaskpackError::Io)?;

        debug!("{}: wrote row {index}", self.path.display());
        self.labels[index] = Some(label);
        Ok(())
    }

    /// Write labels and header, then move the container into place.
    ///
    /// Fails with [`MaskpackError::AllocationSize`] unless every declared row
    /// was written; the temporary file is discarded in that case.
    pub fn finish(self) -> Result<PathBuf, MaskpackError> {
        let written = self.written();
        if written != self.rows {
            return Err(MaskpackError::AllocationSize {
                path: self.path,
                declared: self.rows,
                written,
            });
        }

        let labels: Vec<RowLabel> = self.labels.into_iter().flatten().collect();
        let label_bytes = encode_labels(self.kind, &labels);
        let label_offset = HEADER_LEN + self.rows as u64 * self.shape.byte_len();

        let mut file = self.file;
        {
            let mut out = BufWriter::new(file.as_file_mut());
            out.seek(SeekFrom::Start(0)).map_err(MaskpackError::Io)?;
            out.write_all(MAGIC).map_err(MaskpackError::Io)?;
            write_u32(&mut out, FORMAT_VERSION)?;
            write_u32(&mut out, self.kind.code())?;
            write_u32(&mut out, self.shape.width)?;
            write_u32(&mut out, self.shape.height)?;
            write_u32(&mut out, self.shape.channels)?;
            write_u64(&mut out, self.rows as u64)?;
            write_u64(&mut out, HEADER_LEN)?;
            write_u64(&mut out, label_offset)?;
            write_u64(&mut out, label_bytes.len() as u64)?;
            write_u64(&mut out, 0)?;

            out.seek(SeekFrom::Start(label_offset))
                .map_err(MaskpackError::Io)?;
            out.write_all(&label_bytes).map_err(MaskpackError::Io)?;
            out.flush().map_err(MaskpackError::Io)?;
        }
        file.as_file().sync_all().map_err(MaskpackError::Io)?;

        file.persist(&self.path)
            .map_err(|err| MaskpackError::Io(err.error))?;
        Ok(self.path)
    }

    fn format_error(&self, message: String) -> MaskpackError {
        MaskpackError::ContainerFormat {
            path: self.path.clone(),
            message,
        }
    }
}

fn encode_labels(kind: LabelKind, labels: &[RowLabel]) -> Vec<u8> {
    let mut out = Vec::new();
    match kind {
        LabelKind::Class => out.extend(
            labels
                .iter()
                .filter_map(RowLabel::as_class)
                .map(|code| code as u8),
        ),
        LabelKind::AnnotationRef => {
            let refs: Vec<&str> = labels
                .iter()
                .filter_map(RowLabel::as_annotation_ref)
                .collect();
            let mut offset = 0u64;
            out.extend_from_slice(&offset.to_le_bytes());
            for key in &refs {
                offset += key.len() as u64;
                out.extend_from_slice(&offset.to_le_bytes());
            }
            for key in refs {
                out.extend_from_slice(key.as_bytes());
            }
        }
    }
    out
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<(), MaskpackError> {
    w.write_all(&v.to_le_bytes()).map_err(MaskpackError::Io)
}

fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<(), MaskpackError> {
    w.write_all(&v.to_le_bytes()).map_err(MaskpackError::Io)
}
