use crate::sink::SinkError;
use crate::state::PlaybackStatus;
use lector_synth::SynthesisError;
use lector_text::TextError;
use thiserror::Error;

/// Errors returned to callers of playback control operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("player is busy ({status:?})")]
    Busy { status: PlaybackStatus },

    #[error("player is not playing ({status:?})")]
    NotPlaying { status: PlaybackStatus },

    #[error("no API key configured")]
    MissingApiKey,

    #[error("no voice selected")]
    MissingVoice,

    #[error("nothing to read")]
    EmptyText,

    #[error("speed {0} is outside the supported range")]
    SpeedOutOfRange(f32),

    #[error("request superseded by a newer command")]
    Superseded,

    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("playback engine is no longer running")]
    ChannelClosed,
}
