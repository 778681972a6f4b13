//! Highlight events emitted while audio plays.

use crate::mapper::TextPosition;
use lector_synth::Alignment;
use std::sync::Arc;

/// One tick of highlight data for subscribers driving a UI.
#[derive(Debug, Clone)]
pub struct HighlightFrame {
    /// Seconds into the current paragraph's audio.
    pub current_time: f32,
    /// Document index of the paragraph being spoken.
    pub paragraph_offset: usize,
    /// Alignment for the paragraph, shared rather than copied per tick.
    pub alignment: Arc<Alignment>,
    /// Word under the cursor, when the timestamp lands on one.
    pub position: Option<TextPosition>,
}
