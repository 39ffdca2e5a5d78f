//! Pascal VOC XML label files with face attributes.
//!
//! One XML file per image. Each face box is an `object` element carrying
//! the attribute groups as coded child elements ahead of its `bndbox`:
//!
//! ```xml
//! <annotation verified="yes">
//! 	<folder>faces</folder>
//! 	<filename>0001.jpg</filename>
//! 	<path>/data/faces/0001.jpg</path>
//! 	<source>
//! 		<database>Unknown</database>
//! 	</source>
//! 	<size>
//! 		<width>640</width>
//! 		<height>480</height>
//! 		<depth>3</depth>
//! 	</size>
//! 	<segmented>0</segmented>
//! 	<object>
//! 		<name>face</name>
//! 		<truncated>0</truncated>
//! 		<gender>1</gender>
//! 		<age>0</age>
//! 		<mask>False</mask>
//! 		<mouth>0</mouth>
//! 		<eyeglass>False</eyeglass>
//! 		<sunglass>False</sunglass>
//! 		<eye>0</eye>
//! 		<emotion>0</emotion>
//! 		<blurriness>False</blurriness>
//! 		<illumination>0</illumination>
//! 		<yaw>0</yaw>
//! 		<roll>0</roll>
//! 		<pitch>0</pitch>
//! 		<bndbox>
//! 			<xmin>100</xmin>
//! 			<ymin>120</ymin>
//! 			<xmax>180</xmax>
//! 			<ymax>210</ymax>
//! 		</bndbox>
//! 	</object>
//! </annotation>
//! ```
//!
//! Gender is written as a single bit (`1` = male) but read as
//! `0` = female, anything else = male.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::format::error::FormatError;
use crate::format::traits::{LabelCodec, ParsedLabels, WriteOptions};
use crate::model::{
    AnnotationDocument, AnnotationRecord, BoundingBox, FaceAttributes, Gender, GroupMember,
    ImageSize, Selection,
};

/// Pascal VOC XML codec for face attribute labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalVocCodec;

impl LabelCodec for PascalVocCodec {
    fn id(&self) -> &'static str {
        "voc"
    }

    fn display_name(&self) -> &'static str {
        "Pascal VOC (XML)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["xml"]
    }

    fn encode(
        &self,
        document: &AnnotationDocument,
        options: &WriteOptions,
    ) -> Result<String, FormatError> {
        let size = document
            .image_size()
            .ok_or_else(|| FormatError::MissingDimensions {
                image: document.image_path().to_path_buf(),
            })?;

        let image_path = document.image_path();
        let absolute =
            std::path::absolute(image_path).unwrap_or_else(|_| image_path.to_path_buf());
        let folder = absolute
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let filename = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);

        // <annotation>, with verified="yes" only when verified
        let mut root = BytesStart::new("annotation");
        if document.verified() {
            root.push_attribute(("verified", "yes"));
        }
        writer
            .write_event(Event::Start(root))
            .map_err(|e| FormatError::Xml(e.into()))?;

        self.write_text_element(&mut writer, "folder", &folder)?;
        self.write_text_element(&mut writer, "filename", &filename)?;
        self.write_text_element(&mut writer, "path", &absolute.to_string_lossy())?;

        // <source>
        self.write_start(&mut writer, "source")?;
        self.write_text_element(&mut writer, "database", &options.database)?;
        self.write_end(&mut writer, "source")?;

        // <size>
        self.write_start(&mut writer, "size")?;
        self.write_text_element(&mut writer, "width", &size.width.to_string())?;
        self.write_text_element(&mut writer, "height", &size.height.to_string())?;
        self.write_text_element(&mut writer, "depth", &size.depth_or_default().to_string())?;
        self.write_end(&mut writer, "size")?;

        self.write_text_element(&mut writer, "segmented", "0")?;

        for record in document.records() {
            // Boxes always come from the current points
            let bbox = record.bounding_box()?;
            self.write_object(&mut writer, record, &bbox, size, options)?;
        }

        self.write_end(&mut writer, "annotation")?;

        let mut result = writer.into_inner();
        result.push(b'\n');
        String::from_utf8(result).map_err(|_| FormatError::malformed("Invalid UTF-8 in XML"))
    }

    fn decode(&self, content: &str) -> Result<ParsedLabels, FormatError> {
        let raw = parse_xml(content)?;

        let mut parsed = ParsedLabels {
            verified: raw.verified,
            folder: raw.folder,
            filename: raw.filename,
            path: raw.path,
            image_size: raw.size.as_ref().and_then(RawSize::parse),
            ..ParsedLabels::default()
        };

        for (index, object) in raw.objects.into_iter().enumerate() {
            let Some(bbox) = object.bndbox.as_ref().and_then(RawBndBox::parse) else {
                log::warn!("Skipping object {} without a readable bndbox", index);
                parsed.skipped += 1;
                continue;
            };
            let attributes = object.attributes();
            let label = object.name.unwrap_or_default();
            parsed
                .records
                .push(AnnotationRecord::from_box(label, bbox, attributes));
        }

        log::debug!(
            "Parsed {} records ({} skipped, verified: {})",
            parsed.records.len(),
            parsed.skipped,
            parsed.verified
        );

        Ok(parsed)
    }
}

impl PascalVocCodec {
    /// Write one `object` element.
    fn write_object<W: Write>(
        &self,
        writer: &mut Writer<W>,
        record: &AnnotationRecord,
        bbox: &BoundingBox,
        size: ImageSize,
        options: &WriteOptions,
    ) -> Result<(), FormatError> {
        let attrs = &record.attributes;
        let flag = |on: bool| options.bool_style.format(on);
        let truncated = if bbox.touches_image_edge(size.width, size.height) {
            "1"
        } else {
            "0"
        };

        self.write_start(writer, "object")?;
        self.write_text_element(writer, "name", &record.label)?;
        self.write_text_element(writer, "truncated", truncated)?;

        let gender = if attrs.gender.is(Gender::Male) { "1" } else { "0" };
        self.write_text_element(writer, "gender", gender)?;
        self.write_code(writer, "age", &attrs.age)?;
        self.write_text_element(writer, "mask", flag(attrs.mask.code() == 1))?;
        self.write_code(writer, "mouth", &attrs.mouth)?;
        self.write_text_element(writer, "eyeglass", flag(attrs.eyeglass.code() == 1))?;
        self.write_text_element(writer, "sunglass", flag(attrs.sunglass.code() == 1))?;
        self.write_code(writer, "eye", &attrs.eye)?;
        self.write_code(writer, "emotion", &attrs.emotion)?;
        self.write_text_element(writer, "blurriness", flag(attrs.blur.code() == 1))?;
        self.write_code(writer, "illumination", &attrs.illumination)?;
        self.write_code(writer, "yaw", &attrs.yaw)?;
        self.write_code(writer, "roll", &attrs.roll)?;
        self.write_code(writer, "pitch", &attrs.pitch)?;

        // <bndbox>
        self.write_start(writer, "bndbox")?;
        self.write_text_element(writer, "xmin", &bbox.xmin.to_string())?;
        self.write_text_element(writer, "ymin", &bbox.ymin.to_string())?;
        self.write_text_element(writer, "xmax", &bbox.xmax.to_string())?;
        self.write_text_element(writer, "ymax", &bbox.ymax.to_string())?;
        self.write_end(writer, "bndbox")?;

        self.write_end(writer, "object")
    }

    /// Write a group's integer code; `Unknown` is written as 0.
    fn write_code<W: Write, T: GroupMember>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        selection: &Selection<T>,
    ) -> Result<(), FormatError> {
        self.write_text_element(writer, name, &selection.code().to_string())
    }

    /// Write a simple text element.
    fn write_text_element<W: Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: &str,
    ) -> Result<(), FormatError> {
        self.write_start(writer, name)?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        self.write_end(writer, name)
    }

    fn write_start<W: Write>(&self, writer: &mut Writer<W>, name: &str) -> Result<(), FormatError> {
        writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        Ok(())
    }

    fn write_end<W: Write>(&self, writer: &mut Writer<W>, name: &str) -> Result<(), FormatError> {
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| FormatError::Xml(e.into()))?;
        Ok(())
    }
}

// ============================================================================
// Raw XML structures
// ============================================================================

/// Text of the elements we read, exactly as it appears in the file.
#[derive(Debug, Default)]
struct RawAnnotation {
    verified: bool,
    folder: Option<String>,
    filename: Option<String>,
    path: Option<String>,
    size: Option<RawSize>,
    objects: Vec<RawObject>,
}

impl RawAnnotation {
    /// Text slot for the element path below the root, if it is one we keep.
    fn slot(&mut self, path: &[String]) -> Option<&mut Option<String>> {
        match path {
            [field] => match field.as_str() {
                "folder" => Some(&mut self.folder),
                "filename" => Some(&mut self.filename),
                "path" => Some(&mut self.path),
                _ => None,
            },
            [size, field] if size == "size" => self.size.as_mut()?.slot(field),
            [object, rest @ ..] if object == "object" => self.objects.last_mut()?.slot(rest),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawSize {
    width: Option<String>,
    height: Option<String>,
    depth: Option<String>,
}

impl RawSize {
    fn slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "width" => Some(&mut self.width),
            "height" => Some(&mut self.height),
            "depth" => Some(&mut self.depth),
            _ => None,
        }
    }

    fn parse(&self) -> Option<ImageSize> {
        let width = self.width.as_deref()?.trim().parse().ok()?;
        let height = self.height.as_deref()?.trim().parse().ok()?;
        let size = ImageSize::new(width, height);
        Some(match self.depth.as_deref().and_then(|d| d.trim().parse().ok()) {
            Some(depth) => size.with_depth(depth),
            None => size,
        })
    }
}

#[derive(Debug, Default)]
struct RawObject {
    name: Option<String>,
    gender: Option<String>,
    age: Option<String>,
    mask: Option<String>,
    mouth: Option<String>,
    eyeglass: Option<String>,
    sunglass: Option<String>,
    eye: Option<String>,
    emotion: Option<String>,
    blurriness: Option<String>,
    illumination: Option<String>,
    yaw: Option<String>,
    roll: Option<String>,
    pitch: Option<String>,
    bndbox: Option<RawBndBox>,
}

impl RawObject {
    fn slot(&mut self, path: &[String]) -> Option<&mut Option<String>> {
        match path {
            [field] => match field.as_str() {
                "name" => Some(&mut self.name),
                "gender" => Some(&mut self.gender),
                "age" => Some(&mut self.age),
                "mask" => Some(&mut self.mask),
                "mouth" => Some(&mut self.mouth),
                "eyeglass" => Some(&mut self.eyeglass),
                "sunglass" => Some(&mut self.sunglass),
                "eye" => Some(&mut self.eye),
                "emotion" => Some(&mut self.emotion),
                "blurriness" => Some(&mut self.blurriness),
                "illumination" => Some(&mut self.illumination),
                "yaw" => Some(&mut self.yaw),
                "roll" => Some(&mut self.roll),
                "pitch" => Some(&mut self.pitch),
                _ => None,
            },
            [bndbox, field] if bndbox == "bndbox" => self.bndbox.as_mut()?.slot(field),
            _ => None,
        }
    }

    /// Decode every coded field; absent fields stay `Unknown`.
    fn attributes(&self) -> FaceAttributes {
        FaceAttributes {
            gender: decode_group(&self.gender, "gender"),
            age: decode_group(&self.age, "age"),
            mask: decode_group(&self.mask, "mask"),
            mouth: decode_group(&self.mouth, "mouth"),
            eyeglass: decode_group(&self.eyeglass, "eyeglass"),
            sunglass: decode_group(&self.sunglass, "sunglass"),
            eye: decode_group(&self.eye, "eye"),
            emotion: decode_group(&self.emotion, "emotion"),
            blur: decode_group(&self.blurriness, "blurriness"),
            illumination: decode_group(&self.illumination, "illumination"),
            yaw: decode_group(&self.yaw, "yaw"),
            roll: decode_group(&self.roll, "roll"),
            pitch: decode_group(&self.pitch, "pitch"),
        }
    }
}

#[derive(Debug, Default)]
struct RawBndBox {
    xmin: Option<String>,
    ymin: Option<String>,
    xmax: Option<String>,
    ymax: Option<String>,
}

impl RawBndBox {
    fn slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        match field {
            "xmin" => Some(&mut self.xmin),
            "ymin" => Some(&mut self.ymin),
            "xmax" => Some(&mut self.xmax),
            "ymax" => Some(&mut self.ymax),
            _ => None,
        }
    }

    fn parse(&self) -> Option<BoundingBox> {
        Some(BoundingBox::new(
            parse_coordinate(self.xmin.as_deref()?)?,
            parse_coordinate(self.ymin.as_deref()?)?,
            parse_coordinate(self.xmax.as_deref()?)?,
            parse_coordinate(self.ymax.as_deref()?)?,
        ))
    }
}

/// Collect the text of known elements from an `<annotation>` document.
///
/// Text is kept untrimmed so labels survive a round trip; numeric fields
/// are trimmed when parsed. Objects are collected wherever they appear
/// among the root's children.
fn parse_xml(content: &str) -> Result<RawAnnotation, FormatError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(false);

    let mut raw = RawAnnotation::default();
    let mut seen_root = false;
    // Open elements below the root
    let mut path: Vec<String> = Vec::new();
    let mut in_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if !in_root => {
                open_root(e, seen_root)?;
                raw.verified = is_verified(e);
                seen_root = true;
                in_root = true;
            }
            Ok(Event::Empty(ref e)) if !in_root => {
                open_root(e, seen_root)?;
                raw.verified = is_verified(e);
                seen_root = true;
            }
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match (path.as_slice(), name.as_str()) {
                    ([], "object") => raw.objects.push(RawObject::default()),
                    ([], "size") => raw.size = Some(RawSize::default()),
                    ([object], "bndbox") if object == "object" => {
                        if let Some(current) = raw.objects.last_mut() {
                            current.bndbox = Some(RawBndBox::default());
                        }
                    }
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                // <object/> still counts, and is skipped for lacking a box
                if path.is_empty() && e.name().as_ref() == b"object" {
                    raw.objects.push(RawObject::default());
                }
            }
            Ok(Event::End(_)) => {
                if path.pop().is_none() {
                    in_root = false;
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(slot) = raw.slot(&path) {
                    let text = e.unescape()?;
                    slot.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(slot) = raw.slot(&path) {
                    let text = e.into_inner();
                    slot.get_or_insert_with(String::new)
                        .push_str(&String::from_utf8_lossy(&text));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FormatError::Xml(e)),
            _ => {}
        }
    }

    if !seen_root {
        return Err(FormatError::malformed("Missing <annotation> root element"));
    }
    if in_root {
        return Err(FormatError::malformed("Unexpected end of file inside <annotation>"));
    }

    Ok(raw)
}

/// Accept `root` as the document element, once.
fn open_root(root: &BytesStart<'_>, seen_root: bool) -> Result<(), FormatError> {
    let name = String::from_utf8_lossy(root.name().as_ref()).into_owned();
    if seen_root {
        Err(FormatError::malformed(format!(
            "Unexpected element <{}> after the root",
            name
        )))
    } else if name != "annotation" {
        Err(FormatError::malformed(format!(
            "Expected <annotation> root element, found <{}>",
            name
        )))
    } else {
        Ok(())
    }
}

/// `verified="yes"` on the root element.
fn is_verified(root: &BytesStart<'_>) -> bool {
    root.try_get_attribute("verified")
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .is_some_and(|value| value == "yes")
}

/// Integer text, or finite decimal text truncated toward zero.
fn parse_coordinate(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v as i64)
    })
}

/// Integer code of a field; `True`/`False` count as 1/0.
fn parse_code(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        if text.eq_ignore_ascii_case("true") {
            Some(1)
        } else if text.eq_ignore_ascii_case("false") {
            Some(0)
        } else {
            None
        }
    })
}

fn decode_group<T: GroupMember>(field: &Option<String>, name: &str) -> Selection<T> {
    let Some(text) = field.as_deref() else {
        return Selection::Unknown;
    };
    match parse_code(text) {
        Some(code) => Selection::Selected(T::from_code(code)),
        None => {
            log::warn!("Ignoring unreadable {} value {:?}", name, text);
            Selection::Unknown
        }
    }
}
