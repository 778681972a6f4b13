//! Speech synthesis contract for the lector pipeline.
//!
//! Defines the provider-agnostic [`SpeechSynthesizer`] trait, the request and
//! alignment types that flow through it, and a deterministic scripted
//! implementation for tests and offline runs.

pub mod client;
pub mod error;
pub mod scripted;
pub mod types;

pub use client::{validate_api_key, SpeechSynthesizer};
pub use error::SynthesisError;
pub use scripted::{ScriptedConfig, ScriptedSynthesizer, BYTES_PER_SECOND};
pub use types::{
    Alignment, SynthesisRequest, SynthesizedSpeech, VoiceInfo, VoiceTuning, LAST_CHAR_TAIL_SECS,
};
