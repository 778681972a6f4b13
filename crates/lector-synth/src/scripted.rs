//! Scripted synthesizer for tests and offline runs.
//!
//! Produces deterministic audio and alignment without touching any network.
//! Timing is evenly spaced per character, failure behavior is configurable,
//! so orchestration code can be exercised against every provider outcome.

use crate::client::SpeechSynthesizer;
use crate::error::SynthesisError;
use crate::types::{Alignment, SynthesisRequest, SynthesizedSpeech, VoiceInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Bytes of fake audio per second of speech.
pub const BYTES_PER_SECOND: usize = 16_000;

/// Behavior knobs for the scripted synthesizer.
#[derive(Debug, Clone)]
pub struct ScriptedConfig {
    /// Speaking rate used to space character start times.
    pub chars_per_second: f32,
    /// Artificial latency before each request resolves.
    pub processing_delay_ms: u64,
    /// Succeed this many requests, then fail every one after.
    pub fail_after_requests: Option<usize>,
    /// HTTP status used for scripted failures.
    pub fail_status: u16,
    /// Voice catalog served by `list_voices` and accepted by `synthesize`.
    pub voices: Vec<VoiceInfo>,
}

impl Default for ScriptedConfig {
    fn default() -> Self {
        Self {
            chars_per_second: 15.0,
            processing_delay_ms: 0,
            fail_after_requests: None,
            fail_status: 500,
            voices: default_voices(),
        }
    }
}

fn default_voices() -> Vec<VoiceInfo> {
    vec![
        VoiceInfo {
            id: "sarah".to_string(),
            name: "Sarah".to_string(),
            category: "premade".to_string(),
            labels: Default::default(),
        },
        VoiceInfo {
            id: "george".to_string(),
            name: "George".to_string(),
            category: "premade".to_string(),
            labels: Default::default(),
        },
    ]
}

#[derive(Debug, Default)]
struct ScriptedState {
    requests_made: usize,
}

/// Deterministic in-process stand-in for a real synthesis provider.
pub struct ScriptedSynthesizer {
    config: ScriptedConfig,
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedSynthesizer {
    pub fn new(config: ScriptedConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ScriptedState::default())),
        }
    }

    /// A synthesizer whose every request fails with `status`.
    pub fn failing(status: u16) -> Self {
        Self::new(ScriptedConfig {
            fail_after_requests: Some(0),
            fail_status: status,
            ..Default::default()
        })
    }

    /// How many synthesis requests have been attempted so far.
    pub fn requests_made(&self) -> usize {
        self.state.lock().requests_made
    }

    fn build_speech(&self, text: &str) -> SynthesizedSpeech {
        let characters: Vec<char> = text.chars().collect();
        let spacing = 1.0 / self.config.chars_per_second;
        let start_times: Vec<f32> = (0..characters.len()).map(|i| i as f32 * spacing).collect();
        // each character runs exactly until the next one starts
        let end_times: Vec<f32> = start_times
            .iter()
            .enumerate()
            .map(|(i, &start)| match start_times.get(i + 1) {
                Some(&next) => next,
                None => start + spacing,
            })
            .collect();

        let alignment = Alignment {
            characters,
            start_times,
            end_times: Some(end_times),
        };
        let audio_len = (alignment.duration() * BYTES_PER_SECOND as f32).ceil() as usize;

        SynthesizedSpeech {
            audio: vec![0u8; audio_len],
            alignment,
        }
    }
}

impl Default for ScriptedSynthesizer {
    fn default() -> Self {
        Self::new(ScriptedConfig::default())
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedSpeech, SynthesisError> {
        request.validate()?;

        let requests_made = {
            let mut state = self.state.lock();
            state.requests_made += 1;
            state.requests_made
        };

        if let Some(limit) = self.config.fail_after_requests {
            if requests_made > limit {
                debug!(
                    target: "synth",
                    requests_made,
                    status = self.config.fail_status,
                    "Scripted synthesizer returning failure"
                );
                return Err(SynthesisError::from_status(
                    self.config.fail_status,
                    "scripted failure",
                ));
            }
        }

        if self.config.processing_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.processing_delay_ms)).await;
        }

        if !self.config.voices.iter().any(|v| v.id == request.voice_id) {
            return Err(SynthesisError::InvalidVoice(format!(
                "unknown voice: {}",
                request.voice_id
            )));
        }

        Ok(self.build_speech(&request.text))
    }

    async fn list_voices(&self, api_key: &str) -> Result<Vec<VoiceInfo>, SynthesisError> {
        crate::client::validate_api_key(Some(api_key))?;
        Ok(self.config.voices.clone())
    }
}
