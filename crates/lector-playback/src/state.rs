//! Playback state machine types.

use serde::{Deserialize, Serialize};

/// Slowest playback rate the orchestrator accepts.
pub const MIN_SPEED: f32 = 0.5;
/// Fastest playback rate the orchestrator accepts.
pub const MAX_SPEED: f32 = 3.0;

/// Lifecycle phase of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Playing,
    Paused,
    Error,
}

impl PlaybackStatus {
    /// True while a play request would conflict with work in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, PlaybackStatus::Loading | PlaybackStatus::Playing)
    }
}

/// The full observable player state.
///
/// Every mutation is broadcast as a fresh snapshot, so subscribers replaying
/// the snapshot stream end at exactly the state a direct query would return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub paragraph_index: usize,
    pub sentence_index: usize,
    pub word_index: usize,
    /// Seconds into the current paragraph's audio.
    pub current_time: f32,
    pub speed: f32,
    pub auto_continue: bool,
    pub total_paragraphs: usize,
    pub error: Option<String>,
}

impl PlaybackState {
    pub fn new(speed: f32, auto_continue: bool) -> Self {
        Self {
            status: PlaybackStatus::Idle,
            paragraph_index: 0,
            sentence_index: 0,
            word_index: 0,
            current_time: 0.0,
            speed,
            auto_continue,
            total_paragraphs: 0,
            error: None,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(1.0, true)
    }
}
