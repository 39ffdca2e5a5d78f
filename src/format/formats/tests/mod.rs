//! Unit tests for label file codecs.
//!
//! These tests check the exact XML layout that gets written, lenient
//! reading of partial or damaged files, and round trips through disk.

mod pascal_voc_tests;
mod roundtrip_tests;
