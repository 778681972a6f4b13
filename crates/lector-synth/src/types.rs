//! Request, response and catalog types for the synthesis contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fallback tail duration for the last character when no explicit end exists.
pub const LAST_CHAR_TAIL_SECS: f32 = 0.1;

/// Optional per-request tuning forwarded to the synthesis provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceTuning {
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub model_id: Option<String>,
}

/// Everything the provider needs to speak one paragraph.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub api_key: String,
    pub text: String,
    pub voice_id: String,
    pub tuning: VoiceTuning,
}

impl SynthesisRequest {
    pub fn new(
        api_key: impl Into<String>,
        text: impl Into<String>,
        voice_id: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            text: text.into(),
            voice_id: voice_id.into(),
            tuning: VoiceTuning::default(),
        }
    }
}

/// Per-character timing data for one piece of synthesized audio.
///
/// Parallel arrays, one entry per character of the synthesized text. Start
/// times are seconds from audio start and non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alignment {
    pub characters: Vec<char>,
    pub start_times: Vec<f32>,
    /// Optional explicit ends; when absent a character runs until the next
    /// character's start.
    pub end_times: Option<Vec<f32>>,
}

impl Alignment {
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Check the parallel-array invariant and start-time monotonicity.
    pub fn is_consistent(&self) -> bool {
        if self.characters.len() != self.start_times.len() {
            return false;
        }
        if let Some(ends) = &self.end_times {
            if ends.len() != self.characters.len() {
                return false;
            }
        }
        self.start_times.windows(2).all(|w| w[0] <= w[1])
    }

    /// End of character `i`: explicit end, else the next start, else a short
    /// tail after the final start.
    pub fn effective_end(&self, i: usize) -> f32 {
        if let Some(ends) = &self.end_times {
            if let Some(&end) = ends.get(i) {
                return end;
            }
        }
        match self.start_times.get(i + 1) {
            Some(&next) => next,
            None => self
                .start_times
                .get(i)
                .map(|s| s + LAST_CHAR_TAIL_SECS)
                .unwrap_or(0.0),
        }
    }

    /// Index of the character audible at `t` seconds.
    ///
    /// Intervals are half open, so a `t` sitting exactly on a boundary
    /// belongs to the character starting there. `t` at or past the last start
    /// clamps to the last character; `t` before the first start has no
    /// character yet.
    pub fn index_at(&self, t: f32) -> Option<usize> {
        let first = *self.start_times.first()?;
        if t < first {
            return None;
        }
        let last = self.start_times.len() - 1;
        if t >= self.start_times[last] {
            return Some(last);
        }
        for i in 0..self.start_times.len() {
            if self.start_times[i] <= t && t < self.effective_end(i) {
                return Some(i);
            }
        }
        None
    }

    /// Total audible span in seconds.
    pub fn duration(&self) -> f32 {
        match self.characters.len() {
            0 => 0.0,
            n => self.effective_end(n - 1),
        }
    }
}

/// Audio plus its character alignment, as returned by the provider.
#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    pub audio: Vec<u8>,
    pub alignment: Alignment,
}

/// One entry in the provider's voice catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}
