//! Image-by-image labelling session.
//!
//! A [`Session`] holds the open document and the list of images being
//! walked through. Leaving an image with unsaved changes either
//! auto-saves (when enabled and a save directory is set) or asks the host
//! to confirm through [`LeaveDecision::NeedsConfirmation`].

use std::path::{Path, PathBuf};

use crate::format::FormatError;
use crate::label_file::{ImageCrateProbe, ImageProbe, LabelFileManager, list_images};
use crate::model::{AnnotationDocument, AnnotationRecord, Point, RecordId};

/// Outcome of asking to leave the current image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    /// Nothing unsaved remains; the caller may move on.
    Proceed,
    /// Unsaved changes exist. The host must save or discard first.
    NeedsConfirmation,
}

/// One labelling session over a folder of images.
pub struct Session<P = ImageCrateProbe> {
    manager: LabelFileManager<P>,
    images: Vec<PathBuf>,
    current_index: usize,
    document: Option<AnnotationDocument>,
}

impl<P: ImageProbe> Session<P> {
    pub fn new(manager: LabelFileManager<P>) -> Self {
        Self {
            manager,
            images: Vec::new(),
            current_index: 0,
            document: None,
        }
    }

    pub fn manager(&self) -> &LabelFileManager<P> {
        &self.manager
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn document(&self) -> Option<&AnnotationDocument> {
        self.document.as_ref()
    }

    /// Mutable access for record edits. The document tracks its own dirty
    /// state.
    pub fn document_mut(&mut self) -> Option<&mut AnnotationDocument> {
        self.document.as_mut()
    }

    pub fn is_dirty(&self) -> bool {
        self.document.as_ref().is_some_and(|d| d.is_dirty())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Replace the image list with the images in `folder`.
    ///
    /// The open document is not touched.
    pub fn open_dir(&mut self, folder: &Path) -> Result<usize, FormatError> {
        self.images = list_images(folder)?;
        self.current_index = 0;
        log::info!("Opened {:?}: {} images", folder, self.images.len());
        Ok(self.images.len())
    }

    /// Load `image` and its labels, replacing the open document.
    ///
    /// Callers check [`Session::request_leave`] first; unsaved changes in
    /// the previous document are dropped.
    pub fn open_image(&mut self, image: &Path) -> &AnnotationDocument {
        if let Some(index) = self.images.iter().position(|p| p == image) {
            self.current_index = index;
        }
        let document = self.manager.load_annotations_for_image(image, None);
        self.document.insert(document)
    }

    /// Open a label file directly, replacing the open document.
    pub fn open_label_file(&mut self, label: &Path) -> Result<&AnnotationDocument, FormatError> {
        let document = self.manager.open_label_file(label)?;
        Ok(self.document.insert(document))
    }

    /// Whether the current image may be left.
    ///
    /// A dirty document is saved when auto-save is on and a save directory
    /// is configured. A failed auto-save is returned as an error and the
    /// document stays dirty.
    pub fn request_leave(&mut self) -> Result<LeaveDecision, FormatError> {
        let config = self.manager.config();
        let auto_save = config.auto_save && config.save_dir.is_some();
        let Some(document) = self.document.as_mut().filter(|d| d.is_dirty()) else {
            return Ok(LeaveDecision::Proceed);
        };

        if auto_save {
            let path = self.manager.save_default(document)?;
            log::debug!("Auto-saved {:?}", path);
            Ok(LeaveDecision::Proceed)
        } else {
            Ok(LeaveDecision::NeedsConfirmation)
        }
    }

    /// Move to the next image in the list.
    ///
    /// Stays put on the last image. Nothing moves unless the current image
    /// may be left.
    pub fn next_image(&mut self) -> Result<LeaveDecision, FormatError> {
        let target = (self.current_index + 1).min(self.images.len().saturating_sub(1));
        self.navigate_to(target)
    }

    /// Move to the previous image in the list. Stays put on the first image.
    pub fn prev_image(&mut self) -> Result<LeaveDecision, FormatError> {
        self.navigate_to(self.current_index.saturating_sub(1))
    }

    fn navigate_to(&mut self, index: usize) -> Result<LeaveDecision, FormatError> {
        let Some(image) = self.images.get(index).cloned() else {
            return Ok(LeaveDecision::Proceed);
        };
        if self.document.is_some() && index == self.current_index {
            return Ok(LeaveDecision::Proceed);
        }
        let decision = self.request_leave()?;
        if decision == LeaveDecision::Proceed {
            self.open_image(&image);
        }
        Ok(decision)
    }

    /// Drop unsaved changes by reloading the document from disk.
    pub fn discard_changes(&mut self) {
        if let Some(document) = &mut self.document {
            let image = document.image_path().to_path_buf();
            log::info!("Discarding changes to {:?}", image);
            *document = self.manager.load_annotations_for_image(&image, None);
        }
    }

    /// Close the open document if it may be left.
    pub fn close(&mut self) -> Result<LeaveDecision, FormatError> {
        let decision = self.request_leave()?;
        if decision == LeaveDecision::Proceed {
            self.document = None;
        }
        Ok(decision)
    }

    // ========================================================================
    // Editing and saving
    // ========================================================================

    /// Add a freshly drawn record using the configured attribute defaults.
    pub fn add_record(&mut self, label: &str, points: Vec<Point>) -> Option<RecordId> {
        let defaults = &self.manager.config().attribute_defaults;
        let record = AnnotationRecord::new(label, points, defaults);
        self.document.as_mut().map(|d| d.add_record(record))
    }

    /// Save the open document to its label path.
    pub fn save(&mut self) -> Result<Option<PathBuf>, FormatError> {
        match &mut self.document {
            Some(document) => self.manager.save_default(document).map(Some),
            None => Ok(None),
        }
    }

    /// Toggle the verified flag and save. See [`LabelFileManager::verify`].
    pub fn verify(&mut self) -> Result<Option<PathBuf>, FormatError> {
        match &mut self.document {
            Some(document) => self.manager.verify(document).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelConfig;
    use crate::model::{AttributeValue, FaceAttributes, ImageSize, Mask, Mouth, Selection};

    struct FixedProbe;

    impl ImageProbe for FixedProbe {
        fn probe(&self, _path: &Path) -> Result<ImageSize, image::ImageError> {
            Ok(ImageSize::new(320, 240).with_depth(3))
        }
    }

    fn square() -> Vec<Point> {
        vec![Point::new(10.0, 10.0), Point::new(40.0, 40.0)]
    }

    /// Folder with three empty image files.
    fn folder() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    fn session(config: LabelConfig) -> Session<FixedProbe> {
        Session::new(LabelFileManager::with_probe(config, FixedProbe))
    }

    #[test]
    fn test_open_image_without_labels() {
        let dir = folder();
        let mut s = session(LabelConfig::new());
        let doc = s.open_image(&dir.path().join("a.jpg"));
        assert!(doc.is_empty());
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_clean_document_may_leave() {
        let dir = folder();
        let mut s = session(LabelConfig::new());
        assert_eq!(s.request_leave().unwrap(), LeaveDecision::Proceed);
        s.open_image(&dir.path().join("a.jpg"));
        assert_eq!(s.request_leave().unwrap(), LeaveDecision::Proceed);
    }

    #[test]
    fn test_dirty_document_needs_confirmation() {
        let dir = folder();
        let mut s = session(LabelConfig::new());
        s.open_dir(dir.path()).unwrap();
        s.open_image(&dir.path().join("a.jpg"));
        s.add_record("face", square()).unwrap();

        assert_eq!(s.next_image().unwrap(), LeaveDecision::NeedsConfirmation);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.document().unwrap().len(), 1);

        s.discard_changes();
        assert!(!s.is_dirty());
        assert!(s.document().unwrap().is_empty());
        assert_eq!(s.next_image().unwrap(), LeaveDecision::Proceed);
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn test_auto_save_on_leave() {
        let dir = folder();
        let labels = dir.path().join("labels");
        std::fs::create_dir(&labels).unwrap();
        let mut config = LabelConfig::new().with_save_dir(&labels);
        config.auto_save = true;

        let mut s = session(config);
        assert_eq!(s.open_dir(dir.path()).unwrap(), 3);
        s.open_image(&dir.path().join("a.jpg"));
        s.add_record("face", square()).unwrap();

        assert_eq!(s.next_image().unwrap(), LeaveDecision::Proceed);
        assert_eq!(s.current_index(), 1);
        assert!(labels.join("a.xml").is_file());

        assert_eq!(s.prev_image().unwrap(), LeaveDecision::Proceed);
        assert_eq!(s.document().unwrap().len(), 1);
    }

    #[test]
    fn test_auto_save_needs_save_dir() {
        let dir = folder();
        let mut config = LabelConfig::new();
        config.auto_save = true;

        let mut s = session(config);
        s.open_image(&dir.path().join("a.jpg"));
        s.add_record("face", square()).unwrap();
        assert_eq!(s.request_leave().unwrap(), LeaveDecision::NeedsConfirmation);
    }

    #[test]
    fn test_failed_auto_save_keeps_document() {
        let dir = folder();
        let mut config = LabelConfig::new().with_save_dir(dir.path().join("missing"));
        config.auto_save = true;

        let mut s = session(config);
        s.open_image(&dir.path().join("a.jpg"));
        s.add_record("face", square()).unwrap();

        assert!(s.close().unwrap_err().is_persistence());
        assert!(s.is_dirty());
        assert!(s.document().is_some());
    }

    #[test]
    fn test_navigation_bounds() {
        let dir = folder();
        let mut s = session(LabelConfig::new());
        s.open_dir(dir.path()).unwrap();
        s.open_image(&dir.path().join("c.jpg"));
        assert_eq!(s.current_index(), 2);

        s.next_image().unwrap();
        assert_eq!(s.current_index(), 2);
        s.prev_image().unwrap();
        s.prev_image().unwrap();
        s.prev_image().unwrap();
        assert_eq!(s.current_index(), 0);
        assert!(s.document().unwrap().image_path().ends_with("a.jpg"));
    }

    #[test]
    fn test_save_and_close() {
        let dir = folder();
        let mut s = session(LabelConfig::new());
        assert_eq!(s.save().unwrap(), None);

        s.open_image(&dir.path().join("a.jpg"));
        s.add_record("face", square()).unwrap();
        let path = s.save().unwrap().unwrap();
        assert_eq!(path, dir.path().join("a.xml"));

        assert_eq!(s.close().unwrap(), LeaveDecision::Proceed);
        assert!(s.document().is_none());
    }

    #[test]
    fn test_verify() {
        let dir = folder();
        let mut s = session(LabelConfig::new());
        s.open_image(&dir.path().join("a.jpg"));
        s.verify().unwrap();
        assert!(s.document().unwrap().verified());

        s.open_image(&dir.path().join("a.jpg"));
        assert!(s.document().unwrap().verified());
    }

    #[test]
    fn test_new_records_use_configured_defaults() {
        let dir = folder();
        let mut config = LabelConfig::new();
        config.attribute_defaults = FaceAttributes::baseline().with(Mask::Yes.into());

        let mut s = session(config);
        s.open_image(&dir.path().join("a.jpg"));
        let id = s.add_record("face", square()).unwrap();

        let doc = s.document_mut().unwrap();
        assert_eq!(doc.get(id).unwrap().attributes.mouth, Selection::Selected(Mouth::Uncertain));

        doc.set_attribute(id, AttributeValue::Mask(Mask::No), true).unwrap();
        // Other records still start from the configured template
        let second = s.add_record("face", square()).unwrap();
        assert_eq!(
            s.document().unwrap().get(second).unwrap().attributes.mask,
            Selection::Selected(Mask::Yes)
        );
    }

    #[test]
    fn test_add_record_without_document() {
        let mut s = session(LabelConfig::new());
        assert_eq!(s.add_record("face", square()), None);
    }
}
