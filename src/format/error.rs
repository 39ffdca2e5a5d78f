//! Error types for label file operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::GeometryError;

/// Errors that can occur while reading or writing label files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error while reading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML writer or reader error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The label file could not be understood
    #[error("Malformed label file: {message}")]
    Malformed {
        /// Description of the problem
        message: String,
    },

    /// The path does not carry the label-file extension
    #[error("Unsupported label file format: {path:?}")]
    UnsupportedFormat {
        /// The rejected path
        path: PathBuf,
    },

    /// Writing the label file failed
    #[error("Failed to write {path:?}: {source}")]
    Persistence {
        /// Target path of the write
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The image could not be decoded, so its size is unknown
    #[error("Image dimensions unavailable for {image:?}")]
    MissingDimensions {
        /// The image whose size is missing
        image: PathBuf,
    },

    /// A record's points do not form a box
    #[error("Invalid record geometry: {0}")]
    Geometry(#[from] GeometryError),
}

impl FormatError {
    /// Create a malformed-file error with a message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create an unsupported-format error.
    pub fn unsupported_format(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedFormat { path: path.into() }
    }

    /// Create a persistence error.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Whether the error came from writing to disk.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Persistence { .. } | Self::MissingDimensions { .. }
        )
    }
}
