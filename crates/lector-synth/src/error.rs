use thiserror::Error;

/// Failures from the synthesis provider, already classified so callers can
/// decide between surfacing and quiet degradation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("invalid API key")]
    InvalidApiKey,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("invalid voice or request: {0}")]
    InvalidVoice(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected provider error: {0}")]
    Unknown(String),
}

impl SynthesisError {
    /// Map a provider HTTP status to the matching error class.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            401 | 403 => SynthesisError::InvalidApiKey,
            429 => SynthesisError::RateLimited,
            400 | 404 | 422 => SynthesisError::InvalidVoice(detail.into()),
            500..=599 => SynthesisError::GenerationFailed(detail.into()),
            _ => SynthesisError::Unknown(detail.into()),
        }
    }
}
