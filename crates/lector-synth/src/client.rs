//! Synthesis contract and request validation.

use crate::error::SynthesisError;
use crate::types::{SynthesisRequest, SynthesizedSpeech, VoiceInfo};
use async_trait::async_trait;

/// Check an API key before any network work.
///
/// A missing, empty, or whitespace-only key is rejected locally so callers
/// never spend a request on a key that cannot succeed.
pub fn validate_api_key(key: Option<&str>) -> Result<&str, SynthesisError> {
    match key {
        Some(k) if !k.trim().is_empty() => Ok(k),
        _ => Err(SynthesisError::InvalidApiKey),
    }
}

impl SynthesisRequest {
    /// Validate the request locally before it is handed to a provider.
    pub fn validate(&self) -> Result<(), SynthesisError> {
        validate_api_key(Some(&self.api_key))?;
        if self.text.trim().is_empty() {
            return Err(SynthesisError::InvalidVoice(
                "synthesis text is empty".to_string(),
            ));
        }
        if self.voice_id.trim().is_empty() {
            return Err(SynthesisError::InvalidVoice("voice id is empty".to_string()));
        }
        Ok(())
    }
}

/// A text-to-speech provider.
///
/// Implementations convert one paragraph of text into audio plus character
/// timing, and expose the provider's voice catalog.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedSpeech, SynthesisError>;

    async fn list_voices(&self, api_key: &str) -> Result<Vec<VoiceInfo>, SynthesisError>;
}
