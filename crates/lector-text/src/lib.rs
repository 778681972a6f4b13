//! Text segment model for Lector.
//!
//! This crate carries the read-only document structure the playback core
//! consumes: paragraphs, sentences and words with character offsets, a plain
//! text segmentation helper, and the trait for fetching paragraph text on
//! demand.

pub mod model;
pub mod source;

pub use model::{segment_paragraph, Paragraph, Sentence, Word};
pub use source::{StaticDocument, TextError, TextSegmenter};
