//! Audio sink abstraction and a simulated implementation.
//!
//! The orchestrator drives playback through [`AudioSink`] and never touches
//! an audio backend directly. [`SimulatedSink`] implements the trait with a
//! clock instead of a device: in realtime mode elapsed time tracks the wall
//! clock scaled by rate, in manual mode a [`SinkController`] advances it
//! explicitly so tests control time exactly.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("no audio loaded")]
    NotLoaded,

    #[error("audio backend error: {0}")]
    Backend(String),
}

/// Where decoded audio goes and how its clock is read.
///
/// Implementations must be `Send + Sync`: the orchestrator holds the sink
/// across await points inside a spawned task.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Replace any loaded audio with `audio` and reset the clock to zero.
    async fn load(&mut self, audio: &[u8]) -> Result<(), SinkError>;
    async fn play(&mut self) -> Result<(), SinkError>;
    async fn pause(&mut self) -> Result<(), SinkError>;
    async fn unload(&mut self) -> Result<(), SinkError>;
    /// Change playback rate without disturbing the current position.
    async fn set_rate(&mut self, rate: f32) -> Result<(), SinkError>;

    /// Seconds of audio consumed so far.
    fn elapsed(&self) -> f32;
    /// True once loaded audio has been fully consumed.
    fn is_finished(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimMode {
    /// Clock runs on its own, scaled by rate.
    Realtime,
    /// Clock moves only when a controller advances it.
    Manual,
}

#[derive(Debug)]
struct SimState {
    duration: Option<f32>,
    playing: bool,
    rate: f32,
    /// Seconds accumulated before the most recent resume.
    accumulated: f32,
    /// Wall-clock resume point, realtime mode only.
    resumed_at: Option<Instant>,
}

impl SimState {
    fn new() -> Self {
        Self {
            duration: None,
            playing: false,
            rate: 1.0,
            accumulated: 0.0,
            resumed_at: None,
        }
    }

    fn elapsed(&self) -> f32 {
        let mut t = self.accumulated;
        if let Some(resumed_at) = self.resumed_at {
            t += resumed_at.elapsed().as_secs_f32() * self.rate;
        }
        match self.duration {
            Some(d) => t.min(d),
            None => t,
        }
    }

    /// Fold any running wall-clock time into `accumulated`.
    fn checkpoint(&mut self) {
        self.accumulated = self.elapsed();
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }
}

/// Clock-backed sink for tests and headless runs.
pub struct SimulatedSink {
    mode: SimMode,
    bytes_per_second: usize,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedSink {
    /// A sink whose clock advances with the wall clock while playing.
    pub fn realtime(bytes_per_second: usize) -> Self {
        Self {
            mode: SimMode::Realtime,
            bytes_per_second,
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    /// A sink whose clock only moves when the returned controller says so.
    pub fn manual(bytes_per_second: usize) -> (Self, SinkController) {
        let state = Arc::new(Mutex::new(SimState::new()));
        let sink = Self {
            mode: SimMode::Manual,
            bytes_per_second,
            state: Arc::clone(&state),
        };
        (sink, SinkController { state })
    }
}

#[async_trait]
impl AudioSink for SimulatedSink {
    async fn load(&mut self, audio: &[u8]) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        let rate = state.rate;
        *state = SimState::new();
        state.rate = rate;
        state.duration = Some(audio.len() as f32 / self.bytes_per_second as f32);
        debug!(target: "sink", duration = state.duration, "Audio loaded");
        Ok(())
    }

    async fn play(&mut self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.duration.is_none() {
            return Err(SinkError::NotLoaded);
        }
        if !state.playing {
            state.playing = true;
            if self.mode == SimMode::Realtime {
                state.resumed_at = Some(Instant::now());
            }
        }
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.duration.is_none() {
            return Err(SinkError::NotLoaded);
        }
        state.checkpoint();
        state.playing = false;
        state.resumed_at = None;
        Ok(())
    }

    async fn unload(&mut self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        let rate = state.rate;
        *state = SimState::new();
        state.rate = rate;
        Ok(())
    }

    async fn set_rate(&mut self, rate: f32) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        // checkpoint first so already-elapsed time keeps the old rate
        state.checkpoint();
        state.rate = rate;
        Ok(())
    }

    fn elapsed(&self) -> f32 {
        self.state.lock().elapsed()
    }

    fn is_finished(&self) -> bool {
        let state = self.state.lock();
        match state.duration {
            Some(d) if d > 0.0 => state.elapsed() >= d,
            _ => false,
        }
    }
}

/// Test-side handle that moves a manual [`SimulatedSink`]'s clock.
#[derive(Clone)]
pub struct SinkController {
    state: Arc<Mutex<SimState>>,
}

impl SinkController {
    /// Advance the clock by `seconds` of audio time. Ignored while paused,
    /// clamped to the loaded duration.
    pub fn advance(&self, seconds: f32) {
        let mut state = self.state.lock();
        if !state.playing {
            return;
        }
        state.accumulated += seconds;
        if let Some(d) = state.duration {
            state.accumulated = state.accumulated.min(d);
        }
    }

    /// Jump the clock to the end of the loaded audio.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        if let Some(d) = state.duration {
            state.accumulated = d;
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.state.lock().elapsed()
    }
}
