//! Tests for the face-attribute Pascal VOC codec.

use crate::format::FormatError;
use crate::format::formats::PascalVocCodec;
use crate::format::traits::{BoolStyle, LabelCodec, WriteOptions};
use crate::model::{
    Age, AnnotationDocument, AnnotationRecord, Blur, BoundingBox, Eye, FaceAttributes, Gender,
    ImageSize, Mask, Mouth, Pitch, Point, Selection, Sunglass, Yaw,
};

fn square() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(50.0, 0.0),
        Point::new(50.0, 50.0),
        Point::new(0.0, 50.0),
    ]
}

fn document() -> AnnotationDocument {
    AnnotationDocument::new("/data/faces/0001.jpg")
        .with_image_size(ImageSize::new(100, 100).with_depth(3))
}

/// Wrap object XML in a minimal annotation root.
fn annotation(objects: &str) -> String {
    format!(
        "<annotation>\n\t<folder>faces</folder>\n\t<filename>0001.jpg</filename>\n\t<size>\n\t\t<width>100</width>\n\t\t<height>80</height>\n\t\t<depth>3</depth>\n\t</size>\n{}</annotation>\n",
        objects
    )
}

// ============================================================================
// Writing
// ============================================================================

#[test]
fn test_voc_codec_metadata() {
    let codec = PascalVocCodec;
    assert_eq!(codec.id(), "voc");
    assert_eq!(codec.display_name(), "Pascal VOC (XML)");
    assert!(codec.extensions().contains(&"xml"));
}

#[test]
fn test_encode_empty_document() {
    let xml = PascalVocCodec
        .encode(&document(), &WriteOptions::default())
        .unwrap();

    assert!(xml.starts_with("<annotation>\n"), "no declaration, no attribute: {}", xml);
    assert!(xml.ends_with("</annotation>\n"));
    assert!(!xml.contains("verified"));
    assert!(!xml.contains("<object>"));
    assert!(xml.contains("\t<folder>faces</folder>\n"));
    assert!(xml.contains("\t<filename>0001.jpg</filename>\n"));
    assert!(xml.contains("\t<path>/data/faces/0001.jpg</path>\n"));
    assert!(xml.contains("\t\t<database>Unknown</database>\n"));
    assert!(xml.contains("\t\t<width>100</width>\n"));
    assert!(xml.contains("\t\t<depth>3</depth>\n"));
    assert!(xml.contains("\t<segmented>0</segmented>\n"));
}

#[test]
fn test_encode_verified_attribute() {
    let mut doc = document();
    doc.set_verified(true);
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();
    assert!(xml.starts_with("<annotation verified=\"yes\">\n"));
}

#[test]
fn test_encode_depth_defaults_to_one() {
    let doc =
        AnnotationDocument::new("/data/faces/0001.jpg").with_image_size(ImageSize::new(10, 10));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();
    assert!(xml.contains("<depth>1</depth>"));
}

#[test]
fn test_encode_without_size_fails() {
    let doc = AnnotationDocument::new("/data/faces/0001.jpg");
    let err = PascalVocCodec
        .encode(&doc, &WriteOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::MissingDimensions { .. }));
}

#[test]
fn test_encode_square_is_clamped_and_truncated() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::new("face", square(), &FaceAttributes::baseline()));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();

    assert!(xml.contains("\t\t<name>face</name>\n"));
    assert!(xml.contains("<truncated>1</truncated>"));
    assert!(xml.contains("\t\t\t<xmin>1</xmin>\n"));
    assert!(xml.contains("\t\t\t<ymin>1</ymin>\n"));
    assert!(xml.contains("\t\t\t<xmax>50</xmax>\n"));
    assert!(xml.contains("\t\t\t<ymax>50</ymax>\n"));
}

#[test]
fn test_encode_interior_box_not_truncated() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::from_box(
        "face",
        BoundingBox::new(10, 10, 40, 40),
        FaceAttributes::baseline(),
    ));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();
    assert!(xml.contains("<truncated>0</truncated>"));
}

#[test]
fn test_encode_box_on_bottom_edge_is_truncated() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::from_box(
        "face",
        BoundingBox::new(10, 60, 40, 100),
        FaceAttributes::baseline(),
    ));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();
    assert!(xml.contains("<truncated>1</truncated>"));
}

#[test]
fn test_encode_field_order() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::from_box(
        "face",
        BoundingBox::new(10, 10, 40, 40),
        FaceAttributes::baseline(),
    ));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();

    let order = [
        "<name>", "<truncated>", "<gender>", "<age>", "<mask>", "<mouth>", "<eyeglass>",
        "<sunglass>", "<eye>", "<emotion>", "<blurriness>", "<illumination>", "<yaw>", "<roll>",
        "<pitch>", "<bndbox>", "<xmin>", "<ymin>", "<xmax>", "<ymax>",
    ];
    let positions: Vec<usize> = order.iter().map(|tag| xml.find(tag).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", xml);
}

#[test]
fn test_encode_attribute_codes() {
    let attrs = FaceAttributes::baseline()
        .with(Gender::Male.into())
        .with(Age::Children.into())
        .with(Mask::Yes.into())
        .with(Blur::Yes.into())
        .with(Pitch::Down45.into());
    let mut doc = document();
    doc.add_record(AnnotationRecord::from_box("face", BoundingBox::new(10, 10, 40, 40), attrs));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();

    assert!(xml.contains("<gender>1</gender>"));
    assert!(xml.contains("<age>3</age>"));
    assert!(xml.contains("<mask>True</mask>"));
    assert!(xml.contains("<eyeglass>False</eyeglass>"));
    assert!(xml.contains("<blurriness>True</blurriness>"));
    assert!(xml.contains("<pitch>4</pitch>"));
}

#[test]
fn test_encode_numeric_bool_style() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::from_box(
        "face",
        BoundingBox::new(10, 10, 40, 40),
        FaceAttributes::baseline().with(Sunglass::Yes.into()),
    ));
    let options = WriteOptions::new().bool_style(BoolStyle::Numeric);
    let xml = PascalVocCodec.encode(&doc, &options).unwrap();

    assert!(xml.contains("<sunglass>1</sunglass>"));
    assert!(xml.contains("<mask>0</mask>"));
}

#[test]
fn test_encode_unknown_groups_as_zero() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::from_box(
        "face",
        BoundingBox::new(10, 10, 40, 40),
        FaceAttributes::new(),
    ));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();
    assert!(xml.contains("<gender>0</gender>"));
    assert!(xml.contains("<illumination>0</illumination>"));
    assert!(xml.contains("<mask>False</mask>"));
}

#[test]
fn test_encode_escapes_label() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::from_box(
        "a<b>&c",
        BoundingBox::new(10, 10, 40, 40),
        FaceAttributes::new(),
    ));
    let xml = PascalVocCodec.encode(&doc, &WriteOptions::default()).unwrap();
    assert!(xml.contains("<name>a&lt;b&gt;&amp;c</name>"));

    let parsed = PascalVocCodec.decode(&xml).unwrap();
    assert_eq!(parsed.records[0].label, "a<b>&c");
}

#[test]
fn test_encode_rejects_empty_record() {
    let mut doc = document();
    doc.add_record(AnnotationRecord::new("face", Vec::new(), &FaceAttributes::new()));
    let err = PascalVocCodec
        .encode(&doc, &WriteOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormatError::Geometry(_)));
}

// ============================================================================
// Reading
// ============================================================================

#[test]
fn test_decode_metadata() {
    let parsed = PascalVocCodec.decode(&annotation("")).unwrap();
    assert!(!parsed.verified);
    assert!(parsed.records.is_empty());
    assert_eq!(parsed.folder.as_deref(), Some("faces"));
    assert_eq!(parsed.filename.as_deref(), Some("0001.jpg"));
    assert_eq!(parsed.path, None);
    assert_eq!(parsed.image_size, Some(ImageSize::new(100, 80).with_depth(3)));
}

#[test]
fn test_decode_verified() {
    let xml = "<annotation verified=\"yes\"><folder>f</folder></annotation>";
    assert!(PascalVocCodec.decode(xml).unwrap().verified);

    let xml = "<annotation verified=\"no\"><folder>f</folder></annotation>";
    assert!(!PascalVocCodec.decode(xml).unwrap().verified);
}

#[test]
fn test_decode_full_object() {
    let xml = annotation(
        "\t<object>\n\t\t<name>face</name>\n\t\t<truncated>0</truncated>\n\t\t<gender>0</gender>\n\t\t<age>2</age>\n\t\t<mask>True</mask>\n\t\t<mouth>2</mouth>\n\t\t<eyeglass>False</eyeglass>\n\t\t<sunglass>1</sunglass>\n\t\t<eye>2</eye>\n\t\t<emotion>1</emotion>\n\t\t<blurriness>false</blurriness>\n\t\t<illumination>4</illumination>\n\t\t<yaw>2</yaw>\n\t\t<roll>1</roll>\n\t\t<pitch>3</pitch>\n\t\t<bndbox>\n\t\t\t<xmin>10</xmin>\n\t\t\t<ymin>12</ymin>\n\t\t\t<xmax>30</xmax>\n\t\t\t<ymax>44</ymax>\n\t\t</bndbox>\n\t</object>\n",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    assert_eq!(parsed.records.len(), 1);

    let record = &parsed.records[0];
    assert_eq!(record.label, "face");
    assert_eq!(record.bounding_box().unwrap(), BoundingBox::new(10, 12, 30, 44));
    assert_eq!(record.points.len(), 4);

    let attrs = &record.attributes;
    assert_eq!(attrs.gender, Selection::Selected(Gender::Female));
    assert_eq!(attrs.age, Selection::Selected(Age::Old));
    assert_eq!(attrs.mask, Selection::Selected(Mask::Yes));
    assert_eq!(attrs.mouth, Selection::Selected(Mouth::Uncertain));
    assert_eq!(attrs.sunglass, Selection::Selected(Sunglass::Yes));
    assert_eq!(attrs.eye, Selection::Selected(Eye::Uncertain));
    assert_eq!(attrs.blur, Selection::Selected(Blur::No));
    assert_eq!(attrs.yaw, Selection::Selected(Yaw::Deg60));
    assert_eq!(attrs.pitch, Selection::Selected(Pitch::Down20));
    assert!(attrs.is_complete());
}

#[test]
fn test_decode_gender_nonzero_is_male() {
    for code in ["1", "2", "7", "-1"] {
        let xml = annotation(&format!(
            "<object><name>f</name><gender>{}</gender><bndbox><xmin>1</xmin><ymin>1</ymin><xmax>5</xmax><ymax>5</ymax></bndbox></object>",
            code
        ));
        let parsed = PascalVocCodec.decode(&xml).unwrap();
        assert_eq!(
            parsed.records[0].attributes.gender,
            Selection::Selected(Gender::Male),
            "code {}",
            code
        );
    }
}

#[test]
fn test_decode_missing_fields_stay_unknown() {
    let xml = annotation(
        "<object><name>old</name><mask>1</mask><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    let attrs = &parsed.records[0].attributes;

    assert_eq!(attrs.mask, Selection::Selected(Mask::Yes));
    assert!(attrs.gender.is_unknown());
    assert!(attrs.pitch.is_unknown());
    assert_eq!(attrs.unknown_groups().len(), 12);
}

#[test]
fn test_decode_unreadable_field_stays_unknown() {
    let xml = annotation(
        "<object><name>f</name><age>old</age><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    assert!(parsed.records[0].attributes.age.is_unknown());
}

#[test]
fn test_decode_missing_name_gives_empty_label() {
    let xml = annotation(
        "<object><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    assert_eq!(parsed.records[0].label, "");
}

#[test]
fn test_decode_skips_objects_without_box() {
    let xml = annotation(
        "<object><name>nobox</name></object>\
         <object><name>bad</name><bndbox><xmin>a</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>\
         <object><name>partial</name><bndbox><xmin>1</xmin><ymin>2</ymin></bndbox></object>\
         <object><name>good</name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].label, "good");
    assert_eq!(parsed.skipped, 3);
}

#[test]
fn test_decode_fractional_coordinates() {
    let xml = annotation(
        "<object><name>f</name><bndbox><xmin>10.7</xmin><ymin>2.2</ymin><xmax>30.9</xmax><ymax>40</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    assert_eq!(
        parsed.records[0].bounding_box().unwrap(),
        BoundingBox::new(10, 2, 30, 40)
    );
}

#[test]
fn test_decode_out_of_range_codes_use_fallback() {
    let xml = annotation(
        "<object><name>f</name><age>9</age><mouth>9</mouth><mask>5</mask><sunglass>5</sunglass><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    let attrs = &parsed.records[0].attributes;
    assert_eq!(attrs.age, Selection::Selected(Age::Children));
    assert_eq!(attrs.mouth, Selection::Selected(Mouth::Uncertain));
    assert_eq!(attrs.mask, Selection::Selected(Mask::Yes));
    assert_eq!(attrs.sunglass, Selection::Selected(Sunglass::No));
}

#[test]
fn test_decode_malformed_xml_fails() {
    assert!(PascalVocCodec.decode("<annotation><object>").is_err());
}

#[test]
fn test_decode_keeps_label_whitespace() {
    let bndbox = "<bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox>";
    let xml = annotation(&format!(
        "<object><name> face </name>{b}</object>\
         <object><name>   </name>{b}</object>\
         <object><name>face\n</name>{b}</object>",
        b = bndbox
    ));
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    let labels: Vec<&str> = parsed.records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, [" face ", "   ", "face\n"]);
}

#[test]
fn test_decode_numeric_fields_ignore_padding() {
    let xml = annotation(
        "<object><name>f</name><age>\n 1 \n</age><bndbox>\
         <xmin> 1 </xmin><ymin>\t2</ymin><xmax>3\n</xmax><ymax> 4</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    let record = &parsed.records[0];
    assert_eq!(record.attributes.age, Selection::Selected(Age::Middle));
    assert_eq!(record.bounding_box().unwrap(), BoundingBox::new(1, 2, 3, 4));
}

#[test]
fn test_decode_objects_interleaved_with_other_elements() {
    let xml = "<annotation>\
        <object><name>first</name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>\
        <segmented>0</segmented>\
        <object><name>second</name><bndbox><xmin>5</xmin><ymin>6</ymin><xmax>7</xmax><ymax>8</ymax></bndbox></object>\
        <size><width>20</width><height>10</height></size>\
        <object><name>third</name><bndbox><xmin>2</xmin><ymin>2</ymin><xmax>9</xmax><ymax>9</ymax></bndbox></object>\
        </annotation>";
    let parsed = PascalVocCodec.decode(xml).unwrap();
    let labels: Vec<&str> = parsed.records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["first", "second", "third"]);
    assert_eq!(parsed.skipped, 0);
    assert_eq!(parsed.image_size, Some(ImageSize::new(20, 10)));
}

#[test]
fn test_decode_ignores_nested_lookalike_elements() {
    // A <name> outside an object is not a label
    let xml = annotation(
        "<source><name>db</name></source>\
         <object><name>f</name><part><name>nose</name></part>\
         <bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>",
    );
    let parsed = PascalVocCodec.decode(&xml).unwrap();
    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].label, "f");
}

#[test]
fn test_decode_rejects_foreign_root() {
    let xml = "<notannotation><folder>f</folder>\
        <object><name>f</name><bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox></object>\
        </notannotation>";
    let err = PascalVocCodec.decode(xml).unwrap_err();
    assert!(matches!(err, FormatError::Malformed { .. }));

    let err = PascalVocCodec.decode("").unwrap_err();
    assert!(matches!(err, FormatError::Malformed { .. }));
}
