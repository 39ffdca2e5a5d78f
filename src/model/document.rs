//! The per-image annotation document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use super::attribute::AttributeValue;
use super::geometry::{BoundingBox, GeometryError};
use super::record::{AnnotationRecord, Color, RecordId};
use crate::constants::{DEFAULT_DEPTH, LABEL_FILE_EXTENSION};

/// Errors raised by document mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// No record with this id exists in the document.
    #[error("record {id} not found")]
    NotFound {
        /// The missing record id
        id: RecordId,
    },
}

/// Pixel size of the annotated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
    /// Channel count, when the decoder reported one.
    pub depth: Option<u32>,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: None,
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Depth written to label files.
    pub fn depth_or_default(&self) -> u32 {
        self.depth.unwrap_or(DEFAULT_DEPTH)
    }
}

/// All annotations for one image.
///
/// Records are kept in insertion order, which is also the order they are
/// written in. Every mutation marks the document dirty; the save path
/// marks it clean again.
#[derive(Debug, Clone)]
pub struct AnnotationDocument {
    image_path: PathBuf,
    image_size: Option<ImageSize>,
    verified: bool,
    line_color: Color,
    fill_color: Color,
    records: HashMap<RecordId, AnnotationRecord>,
    order: Vec<RecordId>,
    next_id: RecordId,
    dirty: bool,
}

impl AnnotationDocument {
    /// Create an empty, clean, unverified document for `image_path`.
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            image_size: None,
            verified: false,
            line_color: Color::default_line(),
            fill_color: Color::default_fill(),
            records: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            dirty: false,
        }
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = Some(size);
        self
    }

    pub fn with_colors(mut self, line: Color, fill: Color) -> Self {
        self.line_color = line;
        self.fill_color = fill;
        self
    }

    /// Whether `path` has the label-file extension (case-insensitive).
    pub fn is_label_file(path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(LABEL_FILE_EXTENSION))
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    pub fn set_image_size(&mut self, size: Option<ImageSize>) {
        self.image_size = size;
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn set_verified(&mut self, verified: bool) {
        if self.verified != verified {
            self.verified = verified;
            self.mark_dirty();
        }
    }

    /// Flip the verified flag.
    pub fn toggle_verified(&mut self) {
        self.set_verified(!self.verified);
    }

    pub fn line_color(&self) -> Color {
        self.line_color
    }

    pub fn fill_color(&self) -> Color {
        self.fill_color
    }

    /// Change the document-default colors.
    pub fn set_default_colors(&mut self, line: Color, fill: Color) {
        self.line_color = line;
        self.fill_color = fill;
        self.mark_dirty();
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        if !self.dirty {
            log::trace!("{:?}: marked dirty", self.image_path);
        }
        self.dirty = true;
    }

    #[inline]
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Append a record and return its id.
    pub fn add_record(&mut self, record: AnnotationRecord) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        self.records.insert(id, record);
        self.order.push(id);
        self.mark_dirty();
        id
    }

    /// Remove a record, failing if it is not present.
    pub fn remove_record(&mut self, id: RecordId) -> Result<AnnotationRecord, DocumentError> {
        self.discard_record(id).ok_or(DocumentError::NotFound { id })
    }

    /// Remove a record if present. Deleting twice is a no-op.
    pub fn discard_record(&mut self, id: RecordId) -> Option<AnnotationRecord> {
        let removed = self.records.remove(&id)?;
        self.order.retain(|r| *r != id);
        self.mark_dirty();
        Some(removed)
    }

    /// Swap in a new record under an existing id, returning the old one.
    pub fn replace_record(
        &mut self,
        id: RecordId,
        record: AnnotationRecord,
    ) -> Result<AnnotationRecord, DocumentError> {
        let slot = self
            .records
            .get_mut(&id)
            .ok_or(DocumentError::NotFound { id })?;
        let old = std::mem::replace(slot, record);
        self.mark_dirty();
        Ok(old)
    }

    /// Copy a record and append the copy.
    pub fn duplicate_record(&mut self, id: RecordId) -> Result<RecordId, DocumentError> {
        let copy = self.get(id).ok_or(DocumentError::NotFound { id })?.clone();
        Ok(self.add_record(copy))
    }

    /// Apply `f` to a record and mark the document dirty.
    pub fn update_record<R>(
        &mut self,
        id: RecordId,
        f: impl FnOnce(&mut AnnotationRecord) -> R,
    ) -> Result<R, DocumentError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(DocumentError::NotFound { id })?;
        let out = f(record);
        self.mark_dirty();
        Ok(out)
    }

    /// Set or clear one attribute member on a record.
    ///
    /// Returns the implied change the UI must mirror, if any.
    pub fn set_attribute(
        &mut self,
        id: RecordId,
        value: AttributeValue,
        selected: bool,
    ) -> Result<Option<AttributeValue>, DocumentError> {
        log::debug!("record {}: {:?} = {}", id, value, selected);
        self.update_record(id, |r| r.set_attribute(value, selected))
    }

    pub fn get(&self, id: RecordId) -> Option<&AnnotationRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Records with their ids, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &AnnotationRecord)> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| (*id, r)))
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.iter().map(|(_, r)| r)
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        if !self.records.is_empty() {
            self.mark_dirty();
        }
        self.records.clear();
        self.order.clear();
    }

    /// Replace the record set and verified flag with freshly loaded state,
    /// leaving the document clean.
    pub fn load_records(
        &mut self,
        records: impl IntoIterator<Item = AnnotationRecord>,
        verified: bool,
    ) {
        self.records.clear();
        self.order.clear();
        for record in records {
            self.add_record(record);
        }
        self.verified = verified;
        self.mark_clean();
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Current bounding box of each record, in order.
    pub fn bounding_boxes(&self) -> Vec<(RecordId, Result<BoundingBox, GeometryError>)> {
        self.iter().map(|(id, r)| (id, r.bounding_box())).collect()
    }

    /// Flat form of every record, relative to this document's default colors.
    pub fn to_serializable_form(&self) -> Result<Vec<Map<String, Value>>, GeometryError> {
        self.records()
            .map(|r| r.to_serializable_form(self.line_color, self.fill_color))
            .collect()
    }
}
