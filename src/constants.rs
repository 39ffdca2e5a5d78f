//! Shared constants for the annotation model and label files.

/// Extension of label files, including the leading dot.
pub const LABEL_FILE_SUFFIX: &str = ".xml";

/// Extension of label files without the leading dot.
pub const LABEL_FILE_EXTENSION: &str = "xml";

/// Placeholder written to `source/database`.
pub const DEFAULT_DATABASE: &str = "Unknown";

/// Smallest coordinate a persisted box may carry.
///
/// Zero-valued box coordinates break the downstream detector trainer, so
/// box minimums below this are raised to it.
pub const MIN_BOX_COORDINATE: i64 = 1;

/// Channel depth written when the image size carries no depth.
pub const DEFAULT_DEPTH: u32 = 1;

/// Default outline color (RGBA).
pub const DEFAULT_LINE_COLOR: [u8; 4] = [0, 255, 0, 128];

/// Default fill color (RGBA).
pub const DEFAULT_FILL_COLOR: [u8; 4] = [255, 0, 0, 128];

/// Image extensions probed when looking for the image behind a label file.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];
