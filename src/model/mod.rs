//! Annotation data model: geometry, attributes, records and documents.

mod attribute;
mod document;
mod geometry;
mod record;

pub use attribute::{
    Age, AttributeGroup, AttributeValue, Blur, Emotion, Eye, Eyeglass, FaceAttributes, Gender,
    GroupMember, Illumination, Mask, Mouth, Pitch, Roll, Selection, Sunglass, Yaw,
};
pub use document::{AnnotationDocument, DocumentError, ImageSize};
pub use geometry::{BoundingBox, GeometryError, Point, points_to_bounding_box};
pub use record::{AnnotationRecord, Color, RecordId};
