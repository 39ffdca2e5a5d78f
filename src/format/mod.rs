//! Label file reading and writing.
//!
//! A [`LabelCodec`] maps an [`AnnotationDocument`](crate::model::AnnotationDocument)
//! to and from one on-disk format. The only codec shipped is the
//! face-attribute variant of Pascal VOC XML.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use facelabel::format::{LabelCodec, PascalVocCodec, WriteOptions};
//!
//! PascalVocCodec.write(&document, "img.xml".as_ref(), &WriteOptions::default())?;
//! let parsed = PascalVocCodec.read("img.xml".as_ref())?;
//! ```

mod error;
pub mod formats;
mod traits;

pub use error::FormatError;
pub use formats::PascalVocCodec;
pub use traits::{BoolStyle, LabelCodec, ParsedLabels, WriteOptions};
