//! facelabel - face attribute bounding-box annotations
//!
//! Per-image face boxes tagged with mutually exclusive attribute groups
//! (gender, age, mask, pose, ...), stored as Pascal VOC style XML files
//! next to the images or in a separate label directory.

pub mod config;
pub mod constants;
pub mod format;
pub mod label_file;
pub mod model;
pub mod session;

pub use config::{LabelConfig, LogLevel};
pub use format::{FormatError, LabelCodec, PascalVocCodec, WriteOptions};
pub use label_file::{ImageCrateProbe, ImageProbe, LabelFileManager};
pub use model::{AnnotationDocument, AnnotationRecord, FaceAttributes};
pub use session::{LeaveDecision, Session};
