//! Label file codec implementations.

mod pascal_voc;

#[cfg(test)]
mod tests;

pub use pascal_voc::PascalVocCodec;
