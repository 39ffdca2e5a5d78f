//! Loading and saving the label file behind each image.
//!
//! [`LabelFileManager`] decides where an image's label file lives, reads it
//! leniently, and writes documents back through the XML codec. Image sizes
//! come from an [`ImageProbe`], so tests can run without real images.

use std::path::{Path, PathBuf};

use image::ImageDecoder;

use crate::config::LabelConfig;
use crate::constants::{IMAGE_EXTENSIONS, LABEL_FILE_EXTENSION, LABEL_FILE_SUFFIX};
use crate::format::{FormatError, LabelCodec, PascalVocCodec};
use crate::model::{AnnotationDocument, ImageSize};

/// Source of image dimensions.
pub trait ImageProbe {
    /// Width, height and channel depth of the image at `path`.
    fn probe(&self, path: &Path) -> Result<ImageSize, image::ImageError>;
}

/// [`ImageProbe`] backed by the `image` crate.
///
/// Only the header is decoded. Depth is 3 for color images and 1 for
/// grayscale ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateProbe;

impl ImageProbe for ImageCrateProbe {
    fn probe(&self, path: &Path) -> Result<ImageSize, image::ImageError> {
        let decoder = image::ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let (width, height) = decoder.dimensions();
        let depth = if decoder.color_type().has_color() { 3 } else { 1 };
        Ok(ImageSize::new(width, height).with_depth(depth))
    }
}

/// Whether `path` has one of the known image extensions.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Image files directly inside `folder`, sorted by path.
pub fn list_images(folder: &Path) -> Result<Vec<PathBuf>, FormatError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();

    // Sort by filename for consistent ordering
    images.sort();
    log::debug!("Found {} images in {:?}", images.len(), folder);
    Ok(images)
}

/// Load/save orchestration for label files.
#[derive(Debug, Clone)]
pub struct LabelFileManager<P = ImageCrateProbe> {
    config: LabelConfig,
    probe: P,
    codec: PascalVocCodec,
}

impl LabelFileManager<ImageCrateProbe> {
    /// Create a manager that probes images with the `image` crate.
    pub fn new(config: LabelConfig) -> Self {
        Self::with_probe(config, ImageCrateProbe)
    }
}

impl<P: ImageProbe> LabelFileManager<P> {
    /// Create a manager with a custom image probe.
    pub fn with_probe(config: LabelConfig, probe: P) -> Self {
        Self {
            config,
            probe,
            codec: PascalVocCodec,
        }
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LabelConfig {
        &mut self.config
    }

    pub fn codec(&self) -> &PascalVocCodec {
        &self.codec
    }

    // ========================================================================
    // Path resolution
    // ========================================================================

    /// Where the label file for `image` is written.
    ///
    /// `<save_dir>/<stem>.xml` when a save directory is configured, else
    /// `<stem>.xml` next to the image.
    pub fn label_path_for_image(&self, image: &Path) -> PathBuf {
        let stem = image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}{}", stem, LABEL_FILE_SUFFIX);
        match &self.config.save_dir {
            Some(dir) => dir.join(name),
            None => image.with_file_name(name),
        }
    }

    /// An existing label file for `image`: the save directory first, then
    /// next to the image.
    pub fn find_label_file(&self, image: &Path) -> Option<PathBuf> {
        let saved = self.label_path_for_image(image);
        if saved.is_file() {
            return Some(saved);
        }
        let colocated = image.with_extension(LABEL_FILE_EXTENSION);
        colocated.is_file().then_some(colocated)
    }

    /// An image sitting next to `label` with the same stem.
    pub fn find_image_for_label(&self, label: &Path) -> Option<PathBuf> {
        IMAGE_EXTENSIONS
            .iter()
            .flat_map(|ext| [ext.to_string(), ext.to_ascii_uppercase()])
            .map(|ext| label.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Empty document for `image` with its probed size and the configured
    /// colors. The size stays unset when the image cannot be decoded.
    pub fn new_document(&self, image: &Path) -> AnnotationDocument {
        let mut document = AnnotationDocument::new(image)
            .with_colors(self.config.line_color, self.config.fill_color);
        match self.probe.probe(image) {
            Ok(size) => document.set_image_size(Some(size)),
            Err(e) => log::warn!("Could not read dimensions of {:?}: {}", image, e),
        }
        document
    }

    /// Document for `image`, filled from its label file when one exists.
    ///
    /// `explicit` overrides the label lookup. A damaged or unreadable label
    /// file gives an empty, unverified document.
    pub fn load_annotations_for_image(
        &self,
        image: &Path,
        explicit: Option<&Path>,
    ) -> AnnotationDocument {
        let mut document = self.new_document(image);
        let label = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => self.find_label_file(image),
        };

        if let Some(label) = label {
            let parsed = self.codec.read_lenient(&label);
            log::info!(
                "Loaded {} records for {:?} from {:?}",
                parsed.records.len(),
                image,
                label
            );
            parsed.apply_to(&mut document);
        } else {
            log::debug!("No label file for {:?}", image);
        }
        document
    }

    /// Open a label file directly, finding the image it describes.
    ///
    /// The image is the one recorded in the file's `path` element when that
    /// still exists, else an image next to the label with the same stem.
    pub fn open_label_file(&self, label: &Path) -> Result<AnnotationDocument, FormatError> {
        if !self.codec.is_label_file(label) {
            return Err(FormatError::unsupported_format(label));
        }

        let parsed = self.codec.read_lenient(label);
        let image = parsed
            .path
            .as_deref()
            .map(PathBuf::from)
            .filter(|p| p.is_file())
            .or_else(|| self.find_image_for_label(label))
            .unwrap_or_else(|| {
                let name = parsed.filename.clone().unwrap_or_default();
                if name.is_empty() {
                    label.to_path_buf()
                } else {
                    label.with_file_name(name)
                }
            });

        let mut document = self.new_document(&image);
        parsed.apply_to(&mut document);
        Ok(document)
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Write `document` to `target`.
    ///
    /// Boxes are recomputed from the current points. On success the
    /// document is marked clean; on failure it is left as it was.
    pub fn save_annotations(
        &self,
        document: &mut AnnotationDocument,
        target: &Path,
    ) -> Result<(), FormatError> {
        if !self.codec.is_label_file(target) {
            return Err(FormatError::unsupported_format(target));
        }

        // The document only takes the probed size once the file is written
        let probed = match document.image_size() {
            Some(_) => None,
            None => Some(self.probe.probe(document.image_path()).map_err(|e| {
                log::error!("Cannot save {:?}: {}", target, e);
                FormatError::MissingDimensions {
                    image: document.image_path().to_path_buf(),
                }
            })?),
        };

        let options = self.config.write_options();
        let written = match probed {
            Some(size) => {
                let mut sized = document.clone();
                sized.set_image_size(Some(size));
                self.codec.write(&sized, target, &options)
            }
            None => self.codec.write(document, target, &options),
        };
        if let Err(e) = written {
            log::error!("Failed to save {:?}: {}", target, e);
            return Err(e);
        }

        if probed.is_some() {
            document.set_image_size(probed);
        }
        document.mark_clean();
        Ok(())
    }

    /// Write `document` to its resolved label path.
    pub fn save_default(&self, document: &mut AnnotationDocument) -> Result<PathBuf, FormatError> {
        let target = self.label_path_for_image(document.image_path());
        self.save_annotations(document, &target)?;
        Ok(target)
    }

    /// Flip `verified` and save at once.
    ///
    /// When the save fails the flag and dirty state are restored.
    pub fn verify(&self, document: &mut AnnotationDocument) -> Result<PathBuf, FormatError> {
        let was_dirty = document.is_dirty();
        document.toggle_verified();
        match self.save_default(document) {
            Ok(path) => {
                log::info!("Marked {:?} verified: {}", path, document.verified());
                Ok(path)
            }
            Err(e) => {
                document.toggle_verified();
                if !was_dirty {
                    document.mark_clean();
                }
                Err(e)
            }
        }
    }

    /// Labels from the configured predefined-classes file, if any.
    pub fn predefined_classes(&self) -> Result<Vec<String>, FormatError> {
        match &self.config.predefined_classes {
            Some(path) => load_predefined_classes(path),
            None => Ok(Vec::new()),
        }
    }
}

/// One label per non-empty line, trimmed.
pub fn load_predefined_classes(path: &Path) -> Result<Vec<String>, FormatError> {
    let content = std::fs::read_to_string(path)?;
    let classes: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    log::debug!("Loaded {} predefined classes from {:?}", classes.len(), path);
    Ok(classes)
}
