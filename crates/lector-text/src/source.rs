//! On-demand paragraph text access.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a text source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("paragraph {index} out of range (document has {total})")]
    ParagraphOutOfRange { index: usize, total: usize },

    #[error("text source unavailable: {0}")]
    Unavailable(String),
}

/// Supplies paragraph text on demand.
///
/// Page-side extraction lives behind this trait; the playback core only ever
/// asks for one paragraph at a time.
#[async_trait]
pub trait TextSegmenter: Send + Sync {
    /// Plain text of the paragraph at `index`.
    async fn paragraph_text(&self, index: usize) -> Result<String, TextError>;

    /// Number of paragraphs in the current document.
    async fn total_paragraphs(&self) -> Result<usize, TextError>;
}

/// In-memory document, one string per paragraph.
#[derive(Debug, Clone, Default)]
pub struct StaticDocument {
    paragraphs: Vec<String>,
}

impl StaticDocument {
    pub fn new(paragraphs: Vec<String>) -> Self {
        Self { paragraphs }
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

#[async_trait]
impl TextSegmenter for StaticDocument {
    async fn paragraph_text(&self, index: usize) -> Result<String, TextError> {
        self.paragraphs
            .get(index)
            .cloned()
            .ok_or(TextError::ParagraphOutOfRange {
                index,
                total: self.paragraphs.len(),
            })
    }

    async fn total_paragraphs(&self) -> Result<usize, TextError> {
        Ok(self.paragraphs.len())
    }
}
