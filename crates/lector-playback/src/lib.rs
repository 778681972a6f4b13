//! Read-aloud playback orchestration.
//!
//! One paragraph of a document at a time: text is segmented, synthesized,
//! played through an [`AudioSink`], and mapped back to word positions for
//! highlighting. Auto-continue preloads the next paragraph while the current
//! one plays. All of it is owned by a [`PlaybackOrchestrator`] task and
//! driven through a [`PlaybackHandle`].

pub mod error;
pub mod events;
pub mod mapper;
pub mod metrics;
pub mod orchestrator;
pub mod preload;
pub mod settings;
pub mod sink;
pub mod state;

pub use error::ControlError;
pub use events::HighlightFrame;
pub use mapper::{map_time_to_position, TextPosition};
pub use metrics::PlaybackMetrics;
pub use orchestrator::{OrchestratorConfig, PlaybackHandle, PlaybackOrchestrator};
pub use preload::{FetchedParagraph, PreloadContext, PreloadLookup, PreloadManager};
pub use settings::{
    MemorySettingsStore, PlaybackSettings, SettingsError, SettingsStore, TomlSettingsStore,
};
pub use sink::{AudioSink, SimulatedSink, SinkController, SinkError};
pub use state::{PlaybackState, PlaybackStatus, MAX_SPEED, MIN_SPEED};
