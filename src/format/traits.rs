//! Trait definitions for label file codecs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DATABASE;
use crate::format::error::FormatError;
use crate::model::{AnnotationDocument, AnnotationRecord, ImageSize};

/// Bidirectional mapping between an [`AnnotationDocument`] and one on-disk
/// label format.
pub trait LabelCodec: Send + Sync {
    /// Unique identifier for this codec (e.g. "voc").
    fn id(&self) -> &'static str;

    /// Human-readable name for UI display.
    fn display_name(&self) -> &'static str;

    /// File extensions this codec reads and writes, without the dot.
    fn extensions(&self) -> &[&'static str];

    /// Serialize a document to label-file text.
    fn encode(
        &self,
        document: &AnnotationDocument,
        options: &WriteOptions,
    ) -> Result<String, FormatError>;

    /// Parse label-file text.
    fn decode(&self, content: &str) -> Result<ParsedLabels, FormatError>;

    /// Whether `path` has one of this codec's extensions (case-insensitive).
    fn is_label_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions().iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// Encode `document` and write it to `path`.
    fn write(
        &self,
        document: &AnnotationDocument,
        path: &Path,
        options: &WriteOptions,
    ) -> Result<(), FormatError> {
        if !self.is_label_file(path) {
            return Err(FormatError::unsupported_format(path));
        }
        let content = self.encode(document, options)?;
        std::fs::write(path, content).map_err(|e| FormatError::persistence(path, e))?;
        log::info!(
            "Wrote {} records to {:?} (verified: {})",
            document.len(),
            path,
            document.verified()
        );
        Ok(())
    }

    /// Read and parse the label file at `path`.
    fn read(&self, path: &Path) -> Result<ParsedLabels, FormatError> {
        if !self.is_label_file(path) {
            return Err(FormatError::unsupported_format(path));
        }
        let content = std::fs::read_to_string(path)?;
        self.decode(&content)
    }

    /// Like [`LabelCodec::read`], but any failure yields empty, unverified
    /// labels. The failure is logged.
    fn read_lenient(&self, path: &Path) -> ParsedLabels {
        match self.read(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Treating {:?} as unannotated: {}", path, e);
                ParsedLabels::default()
            }
        }
    }
}

/// Text used for the boolean attribute fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolStyle {
    /// `True` / `False`
    #[default]
    Literal,
    /// `1` / `0`
    Numeric,
}

impl BoolStyle {
    pub fn format(&self, value: bool) -> &'static str {
        match (self, value) {
            (BoolStyle::Literal, true) => "True",
            (BoolStyle::Literal, false) => "False",
            (BoolStyle::Numeric, true) => "1",
            (BoolStyle::Numeric, false) => "0",
        }
    }
}

/// Options for writing label files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Encoding of the boolean attribute fields.
    pub bool_style: BoolStyle,

    /// Value of `source/database`.
    pub database: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            bool_style: BoolStyle::default(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl WriteOptions {
    /// Create new write options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the boolean field encoding.
    pub fn bool_style(mut self, style: BoolStyle) -> Self {
        self.bool_style = style;
        self
    }
}

/// Result of parsing a label file.
#[derive(Debug, Clone, Default)]
pub struct ParsedLabels {
    /// True only when the root carried `verified="yes"`.
    pub verified: bool,

    /// Records in file order.
    pub records: Vec<AnnotationRecord>,

    /// `folder` element, if present.
    pub folder: Option<String>,

    /// `filename` element, if present.
    pub filename: Option<String>,

    /// `path` element, if present.
    pub path: Option<String>,

    /// `size` element, if present and numeric.
    pub image_size: Option<ImageSize>,

    /// Objects dropped because their box was missing or unreadable.
    pub skipped: usize,
}

impl ParsedLabels {
    /// Move the parsed records and verified flag into `document`.
    pub fn apply_to(self, document: &mut AnnotationDocument) {
        if document.image_size().is_none() {
            document.set_image_size(self.image_size);
        }
        document.load_records(self.records, self.verified);
    }
}
