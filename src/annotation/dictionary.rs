//! Label and size dictionaries persisted beside the detection container.
//!
//! Both files are JSON objects keyed by the annotation path string stored in
//! the container's label column.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::model::{AnnotatedObject, AnnotationRecord, ImageSize};
use crate::error::MaskpackError;

/// Annotation path -> object list.
pub type LabelDictionary = BTreeMap<String, Vec<AnnotatedObject>>;

/// Annotation path -> declared image size.
pub type SizeDictionary = BTreeMap<String, ImageSize>;

/// Rebuild the record for `key` from both dictionaries.
pub fn lookup_record(
    labels: &LabelDictionary,
    sizes: &SizeDictionary,
    key: &str,
) -> Result<AnnotationRecord, MaskpackError> {
    match (labels.get(key), sizes.get(key)) {
        (Some(objects), Some(size)) => Ok(AnnotationRecord {
            size: *size,
            objects: objects.clone(),
        }),
        _ => Err(MaskpackError::MissingDictionaryEntry {
            key: key.to_string(),
        }),
    }
}

pub fn read_label_dictionary(path: &Path) -> Result<LabelDictionary, MaskpackError> {
    read_json(path)
}

pub fn read_size_dictionary(path: &Path) -> Result<SizeDictionary, MaskpackError> {
    read_json(path)
}

pub fn write_label_dictionary(path: &Path, labels: &LabelDictionary) -> Result<(), MaskpackError> {
    write_json(path, labels)
}

pub fn write_size_dictionary(path: &Path, sizes: &SizeDictionary) -> Result<(), MaskpackError> {
    write_json(path, sizes)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, MaskpackError> {
    let file = File::open(path).map_err(MaskpackError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| MaskpackError::SideChannelParse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MaskpackError> {
    let file = File::create(path).map_err(MaskpackError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer(writer, value).map_err(|source| MaskpackError::SideChannelWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::BoundingBox;

    #[test]
    fn dictionaries_roundtrip_through_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let key = "dataset/detection/labels/a.xml".to_string();

        let mut labels = LabelDictionary::new();
        labels.insert(
            key.clone(),
            vec![
                AnnotatedObject::new("good", BoundingBox::new(1, 2, 3, 4)),
                AnnotatedObject::new("none", BoundingBox::new(5, 6, 7, 8)),
            ],
        );
        let mut sizes = SizeDictionary::new();
        sizes.insert(key.clone(), ImageSize::new(640, 480));

        let label_path = temp.path().join("label.txt");
        let size_path = temp.path().join("size.txt");
        write_label_dictionary(&label_path, &labels).expect("write labels");
        write_size_dictionary(&size_path, &sizes).expect("write sizes");

        let raw = std::fs::read_to_string(&size_path).expect("read size.txt");
        assert_eq!(raw, r#"{"dataset/detection/labels/a.xml":[640,480]}"#);

        let labels_back = read_label_dictionary(&label_path).expect("read labels");
        let sizes_back = read_size_dictionary(&size_path).expect("read sizes");
        let record = lookup_record(&labels_back, &sizes_back, &key).expect("lookup");
        assert_eq!(record.size, ImageSize::new(640, 480));
        assert_eq!(record.objects.len(), 2);
        assert_eq!(record.objects[1].name, "none");
    }

    #[test]
    fn lookup_requires_both_entries() {
        let mut labels = LabelDictionary::new();
        labels.insert("k".into(), vec![]);
        let sizes = SizeDictionary::new();
        let err = lookup_record(&labels, &sizes, "k").unwrap_err();
        assert!(matches!(err, MaskpackError::MissingDictionaryEntry { .. }));
    }

    #[test]
    fn corrupt_dictionary_reports_path() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("label.txt");
        std::fs::write(&path, "{not json").expect("write");
        let err = read_label_dictionary(&path).unwrap_err();
        match err {
            MaskpackError::SideChannelParse { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
