//! Round trips through label files on disk.
//!
//! These tests write a document, read it back into a fresh document and
//! compare what a later session would see.

use std::path::Path;

use crate::format::FormatError;
use crate::format::formats::PascalVocCodec;
use crate::format::traits::{BoolStyle, LabelCodec, WriteOptions};
use crate::model::{
    AnnotationDocument, AnnotationRecord, BoundingBox, Emotion, FaceAttributes, Gender,
    Illumination, ImageSize, Mask, Point, Roll,
};

fn image_document(dir: &Path) -> AnnotationDocument {
    AnnotationDocument::new(dir.join("img.jpg"))
        .with_image_size(ImageSize::new(640, 480).with_depth(3))
}

fn reload(dir: &Path, path: &Path) -> AnnotationDocument {
    let mut doc = image_document(dir);
    PascalVocCodec.read(path).unwrap().apply_to(&mut doc);
    doc
}

#[test]
fn test_roundtrip_records_and_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.xml");

    let mut doc = image_document(dir.path());
    doc.set_verified(true);
    let first = FaceAttributes::baseline()
        .with(Gender::Male.into())
        .with(Mask::Yes.into())
        .with(Illumination::YinYang.into());
    let second = FaceAttributes::baseline()
        .with(Emotion::Shock.into())
        .with(Roll::Deg45.into());
    doc.add_record(AnnotationRecord::from_box("a", BoundingBox::new(100, 120, 180, 210), first));
    doc.add_record(AnnotationRecord::from_box("b", BoundingBox::new(300, 40, 360, 110), second));

    PascalVocCodec.write(&doc, &path, &WriteOptions::default()).unwrap();
    let loaded = reload(dir.path(), &path);

    assert!(loaded.verified());
    assert!(!loaded.is_dirty());
    assert_eq!(loaded.len(), 2);

    let records: Vec<_> = loaded.records().collect();
    assert_eq!(records[0].label, "a");
    assert_eq!(records[0].attributes, first);
    assert_eq!(records[0].bounding_box().unwrap(), BoundingBox::new(100, 120, 180, 210));
    assert_eq!(records[1].label, "b");
    assert_eq!(records[1].attributes, second);
}

#[test]
fn test_roundtrip_drawn_points_reduce_to_box() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.xml");

    let mut doc = image_document(dir.path());
    let points = vec![
        Point::new(0.0, 0.0),
        Point::new(50.0, 0.0),
        Point::new(50.0, 50.0),
        Point::new(0.0, 50.0),
    ];
    doc.add_record(AnnotationRecord::new("face", points, &FaceAttributes::baseline()));
    PascalVocCodec.write(&doc, &path, &WriteOptions::default()).unwrap();

    let loaded = reload(dir.path(), &path);
    let record = loaded.records().next().unwrap();
    assert_eq!(record.bounding_box().unwrap(), BoundingBox::new(1, 1, 50, 50));
}

#[test]
fn test_roundtrip_numeric_bools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.xml");

    let mut doc = image_document(dir.path());
    let attrs = FaceAttributes::baseline().with(Mask::Yes.into());
    doc.add_record(AnnotationRecord::from_box("f", BoundingBox::new(5, 5, 9, 9), attrs));
    let options = WriteOptions::new().bool_style(BoolStyle::Numeric);
    PascalVocCodec.write(&doc, &path, &options).unwrap();

    let loaded = reload(dir.path(), &path);
    assert_eq!(loaded.records().next().unwrap().attributes, attrs);
}

#[test]
fn test_roundtrip_unknown_groups_read_back_as_first_member() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.xml");

    let mut doc = image_document(dir.path());
    doc.add_record(AnnotationRecord::from_box(
        "f",
        BoundingBox::new(5, 5, 9, 9),
        FaceAttributes::new(),
    ));
    PascalVocCodec.write(&doc, &path, &WriteOptions::default()).unwrap();

    let loaded = reload(dir.path(), &path);
    assert_eq!(loaded.records().next().unwrap().attributes, FaceAttributes::baseline());
}

#[test]
fn test_write_rejects_other_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.txt");

    let err = PascalVocCodec
        .write(&image_document(dir.path()), &path, &WriteOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedFormat { .. }));
    assert!(!path.exists());
}

#[test]
fn test_write_to_missing_directory_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("img.xml");

    let err = PascalVocCodec
        .write(&image_document(dir.path()), &path, &WriteOptions::default())
        .unwrap_err();
    assert!(err.is_persistence());
}

#[test]
fn test_read_lenient_on_damaged_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.xml");
    std::fs::write(&path, "<annotation verified=\"yes\"><object>").unwrap();

    let parsed = PascalVocCodec.read_lenient(&path);
    assert!(!parsed.verified);
    assert!(parsed.records.is_empty());

    let missing = PascalVocCodec.read_lenient(&dir.path().join("nothing.xml"));
    assert!(missing.records.is_empty());
}

#[test]
fn test_reading_replaces_existing_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.xml");

    let mut doc = image_document(dir.path());
    doc.add_record(AnnotationRecord::from_box(
        "saved",
        BoundingBox::new(5, 5, 9, 9),
        FaceAttributes::new(),
    ));
    PascalVocCodec.write(&doc, &path, &WriteOptions::default()).unwrap();

    doc.add_record(AnnotationRecord::from_box(
        "unsaved",
        BoundingBox::new(5, 5, 9, 9),
        FaceAttributes::new(),
    ));
    PascalVocCodec.read(&path).unwrap().apply_to(&mut doc);

    let labels: Vec<_> = doc.records().map(|r| r.label.clone()).collect();
    assert_eq!(labels, vec!["saved"]);
}

#[test]
fn test_roundtrip_keeps_label_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("img.xml");

    let mut doc = image_document(dir.path());
    for label in [" face ", "   ", "face\n", ""] {
        doc.add_record(AnnotationRecord::from_box(
            label,
            BoundingBox::new(10, 10, 20, 20),
            FaceAttributes::baseline(),
        ));
    }
    PascalVocCodec
        .write(&doc, &path, &WriteOptions::default())
        .unwrap();

    let loaded = reload(dir.path(), &path);
    let labels: Vec<_> = loaded.records().map(|r| r.label.clone()).collect();
    assert_eq!(labels, vec![" face ", "   ", "face\n", ""]);
}
