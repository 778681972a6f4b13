//! Playback orchestrator.
//!
//! A single task owns the player: the audio sink, the state snapshot, the
//! preload slot. Callers talk to it through a [`PlaybackHandle`], commands
//! travel over a channel and answers come back on oneshot replies, so state
//! queries and control operations stay consistent with each other even while
//! a load is in flight. Synthesis runs in spawned tasks that report back over
//! internal channels; every load carries a generation number and results from
//! a superseded generation are dropped on arrival.

use crate::error::ControlError;
use crate::events::HighlightFrame;
use crate::mapper::map_time_to_position;
use crate::metrics::PlaybackMetrics;
use crate::preload::{
    fetch_paragraph, FetchedParagraph, PreloadContext, PreloadFinish, PreloadLookup,
    PreloadManager, PreloadOutcome,
};
use crate::settings::{PlaybackSettings, SettingsStore};
use crate::sink::AudioSink;
use crate::state::{PlaybackState, PlaybackStatus, MAX_SPEED, MIN_SPEED};
use lector_synth::{
    validate_api_key, Alignment, SpeechSynthesizer, SynthesisRequest, VoiceTuning,
};
use lector_text::{segment_paragraph, Paragraph, TextSegmenter};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Tuning knobs for the orchestrator loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How often playback position is sampled while playing.
    pub tick_interval: Duration,
    pub command_capacity: usize,
    pub broadcast_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            command_capacity: 32,
            broadcast_capacity: 64,
        }
    }
}

enum Command {
    Play {
        text: String,
        paragraph_index: usize,
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    SetSpeed {
        speed: f32,
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    JumpToParagraph {
        paragraph_index: usize,
        text: String,
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    GetState {
        reply: oneshot::Sender<PlaybackState>,
    },
    SetAutoContinue {
        enabled: bool,
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    SetTotalParagraphs {
        total: usize,
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    SetVoice {
        voice_id: String,
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
    SetApiKey {
        api_key: String,
        reply: oneshot::Sender<Result<(), ControlError>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOrigin {
    Explicit,
    AutoContinue,
}

struct LoadOutcome {
    generation: u64,
    paragraph_index: usize,
    origin: LoadOrigin,
    result: Result<FetchedParagraph, ControlError>,
}

struct ActiveParagraph {
    paragraph: Paragraph,
    alignment: Arc<Alignment>,
}

/// Cloneable front door to a running orchestrator.
#[derive(Clone)]
pub struct PlaybackHandle {
    command_tx: mpsc::Sender<Command>,
    state_tx: broadcast::Sender<PlaybackState>,
    highlight_tx: broadcast::Sender<HighlightFrame>,
    metrics: PlaybackMetrics,
}

impl PlaybackHandle {
    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, ControlError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| ControlError::ChannelClosed)?;
        reply_rx.await.map_err(|_| ControlError::ChannelClosed)
    }

    /// Start reading `text` as document paragraph `paragraph_index`, or
    /// resume if paused.
    pub async fn play(
        &self,
        text: impl Into<String>,
        paragraph_index: usize,
    ) -> Result<(), ControlError> {
        let text = text.into();
        self.request(|reply| Command::Play {
            text,
            paragraph_index,
            reply,
        })
        .await?
    }

    pub async fn pause(&self) -> Result<(), ControlError> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    pub async fn stop(&self) -> Result<(), ControlError> {
        self.request(|reply| Command::Stop { reply }).await?
    }

    pub async fn set_speed(&self, speed: f32) -> Result<(), ControlError> {
        self.request(|reply| Command::SetSpeed { speed, reply }).await?
    }

    /// Stop whatever is playing and start `paragraph_index` from its top.
    pub async fn jump_to_paragraph(
        &self,
        paragraph_index: usize,
        text: impl Into<String>,
    ) -> Result<(), ControlError> {
        let text = text.into();
        self.request(|reply| Command::JumpToParagraph {
            paragraph_index,
            text,
            reply,
        })
        .await?
    }

    /// Snapshot of the current player state.
    pub async fn state(&self) -> Result<PlaybackState, ControlError> {
        self.request(|reply| Command::GetState { reply }).await
    }

    pub async fn set_auto_continue(&self, enabled: bool) -> Result<(), ControlError> {
        self.request(|reply| Command::SetAutoContinue { enabled, reply })
            .await?
    }

    pub async fn set_total_paragraphs(&self, total: usize) -> Result<(), ControlError> {
        self.request(|reply| Command::SetTotalParagraphs { total, reply })
            .await?
    }

    pub async fn set_voice(&self, voice_id: impl Into<String>) -> Result<(), ControlError> {
        let voice_id = voice_id.into();
        self.request(|reply| Command::SetVoice { voice_id, reply })
            .await?
    }

    pub async fn set_api_key(&self, api_key: impl Into<String>) -> Result<(), ControlError> {
        let api_key = api_key.into();
        self.request(|reply| Command::SetApiKey { api_key, reply })
            .await?
    }

    /// Subscribe to state snapshots, one per mutation.
    pub fn subscribe_state(&self) -> broadcast::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to per-tick highlight frames.
    pub fn subscribe_highlights(&self) -> broadcast::Receiver<HighlightFrame> {
        self.highlight_tx.subscribe()
    }

    pub fn metrics(&self) -> PlaybackMetrics {
        self.metrics.clone()
    }
}

/// The playback engine. Construct with [`PlaybackOrchestrator::new`], then
/// drive it by spawning [`run`](PlaybackOrchestrator::run).
pub struct PlaybackOrchestrator {
    command_rx: mpsc::Receiver<Command>,
    load_tx: mpsc::Sender<LoadOutcome>,
    load_rx: mpsc::Receiver<LoadOutcome>,
    preload_rx: mpsc::Receiver<PreloadOutcome>,
    state_tx: broadcast::Sender<PlaybackState>,
    highlight_tx: broadcast::Sender<HighlightFrame>,
    state: PlaybackState,
    active: Option<ActiveParagraph>,
    preload: PreloadManager,
    sink: Box<dyn AudioSink>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    segmenter: Arc<dyn TextSegmenter>,
    settings_store: Arc<dyn SettingsStore>,
    settings: PlaybackSettings,
    metrics: PlaybackMetrics,
    load_generation: u64,
    pending_reply: Option<oneshot::Sender<Result<(), ControlError>>>,
    awaiting_preload: Option<usize>,
    tick_interval: Duration,
}

impl PlaybackOrchestrator {
    pub async fn new(
        segmenter: Arc<dyn TextSegmenter>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Box<dyn AudioSink>,
        settings_store: Arc<dyn SettingsStore>,
        config: OrchestratorConfig,
    ) -> (Self, PlaybackHandle) {
        let mut settings = settings_store.load().await;
        // a hand-edited settings file must not smuggle in an unusable rate
        settings.speed = if settings.speed.is_finite() {
            settings.speed.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            1.0
        };

        let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
        let (state_tx, _) = broadcast::channel(config.broadcast_capacity);
        let (highlight_tx, _) = broadcast::channel(config.broadcast_capacity);
        let (load_tx, load_rx) = mpsc::channel(8);
        let metrics = PlaybackMetrics::default();
        let (preload, preload_rx) = PreloadManager::new(
            Arc::clone(&segmenter),
            Arc::clone(&synthesizer),
            metrics.clone(),
        );

        let handle = PlaybackHandle {
            command_tx,
            state_tx: state_tx.clone(),
            highlight_tx: highlight_tx.clone(),
            metrics: metrics.clone(),
        };

        let orchestrator = Self {
            command_rx,
            load_tx,
            load_rx,
            preload_rx,
            state_tx,
            highlight_tx,
            state: PlaybackState::new(settings.speed, settings.auto_continue),
            active: None,
            preload,
            sink,
            synthesizer,
            segmenter,
            settings_store,
            settings,
            metrics,
            load_generation: 0,
            pending_reply: None,
            awaiting_preload: None,
            tick_interval: config.tick_interval,
        };

        (orchestrator, handle)
    }

    /// Run until every handle is dropped.
    pub async fn run(mut self) {
        info!(
            target: "playback",
            speed = self.state.speed,
            auto_continue = self.state.auto_continue,
            "Playback orchestrator started"
        );
        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                Some(outcome) = self.load_rx.recv() => {
                    self.handle_load_outcome(outcome).await;
                }
                Some(outcome) = self.preload_rx.recv() => {
                    self.handle_preload_outcome(outcome).await;
                }
                _ = tick.tick() => {
                    self.handle_tick().await;
                }
            }
        }

        self.preload.invalidate();
        info!(
            target: "playback",
            ticks = self.metrics.ticks.load(Ordering::Relaxed),
            auto_advances = self.metrics.auto_advances.load(Ordering::Relaxed),
            preload_hits = self.metrics.preload_hits.load(Ordering::Relaxed),
            preload_misses = self.metrics.preload_misses.load(Ordering::Relaxed),
            synthesis_failures = self.metrics.synthesis_failures.load(Ordering::Relaxed),
            "Playback orchestrator stopped"
        );
    }

    /// Mutate the state and broadcast the new snapshot. Every state change
    /// goes through here, which keeps queries and the snapshot stream
    /// identical by construction.
    fn apply(&mut self, mutate: impl FnOnce(&mut PlaybackState)) {
        mutate(&mut self.state);
        let _ = self.state_tx.send(self.state.clone());
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play {
                text,
                paragraph_index,
                reply,
            } => self.handle_play(text, paragraph_index, reply).await,
            Command::Pause { reply } => {
                let _ = reply.send(self.handle_pause().await);
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.handle_stop().await);
            }
            Command::SetSpeed { speed, reply } => {
                let _ = reply.send(self.handle_set_speed(speed).await);
            }
            Command::JumpToParagraph {
                paragraph_index,
                text,
                reply,
            } => self.handle_jump(paragraph_index, text, reply).await,
            Command::GetState { reply } => {
                let _ = reply.send(self.state.clone());
            }
            Command::SetAutoContinue { enabled, reply } => {
                let _ = reply.send(self.handle_set_auto_continue(enabled).await);
            }
            Command::SetTotalParagraphs { total, reply } => {
                self.apply(|s| s.total_paragraphs = total);
                let _ = reply.send(Ok(()));
            }
            Command::SetVoice { voice_id, reply } => {
                let _ = reply.send(self.handle_set_voice(voice_id).await);
            }
            Command::SetApiKey { api_key, reply } => {
                let _ = reply.send(self.handle_set_api_key(api_key).await);
            }
        }
    }

    async fn handle_play(
        &mut self,
        text: String,
        paragraph_index: usize,
        reply: oneshot::Sender<Result<(), ControlError>>,
    ) {
        if self.state.status.is_busy() {
            let _ = reply.send(Err(ControlError::Busy {
                status: self.state.status,
            }));
            return;
        }

        // resume in place, no new synthesis
        if self.state.status == PlaybackStatus::Paused && self.active.is_some() {
            let result = self.sink.play().await.map_err(ControlError::from);
            if result.is_ok() {
                self.apply(|s| s.status = PlaybackStatus::Playing);
            }
            let _ = reply.send(result);
            return;
        }

        let credentials = match self.credentials() {
            Ok(c) => c,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };
        if text.trim().is_empty() {
            let _ = reply.send(Err(ControlError::EmptyText));
            return;
        }

        self.pending_reply = Some(reply);
        self.begin_load(paragraph_index, Some(text), LoadOrigin::Explicit, credentials);
    }

    /// API key and voice from settings, checked before any network work.
    fn credentials(&self) -> Result<(String, String), ControlError> {
        let api_key = validate_api_key(self.settings.api_key.as_deref())
            .map_err(|_| ControlError::MissingApiKey)?
            .to_string();
        let voice_id = match self.settings.voice_id.as_deref() {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => return Err(ControlError::MissingVoice),
        };
        Ok((api_key, voice_id))
    }

    /// Kick off synthesis for a paragraph in a background task.
    ///
    /// With `text` provided the caller already has the paragraph content;
    /// otherwise it is fetched from the segmenter first.
    fn begin_load(
        &mut self,
        paragraph_index: usize,
        text: Option<String>,
        origin: LoadOrigin,
        credentials: (String, String),
    ) {
        self.load_generation += 1;
        let generation = self.load_generation;
        self.apply(|s| {
            s.status = PlaybackStatus::Loading;
            s.error = None;
            s.paragraph_index = paragraph_index;
            s.sentence_index = 0;
            s.word_index = 0;
            s.current_time = 0.0;
        });
        debug!(
            target: "playback",
            paragraph = paragraph_index,
            generation,
            origin = ?origin,
            "Loading paragraph"
        );

        let (api_key, voice_id) = credentials;
        let synthesizer = Arc::clone(&self.synthesizer);
        let segmenter = Arc::clone(&self.segmenter);
        let load_tx = self.load_tx.clone();

        tokio::spawn(async move {
            let tuning = VoiceTuning::default();
            let result = match text {
                Some(text) => {
                    let mut request = SynthesisRequest::new(&api_key, &text, &voice_id);
                    request.tuning = tuning;
                    match synthesizer.synthesize(&request).await {
                        Ok(speech) => Ok(FetchedParagraph {
                            paragraph_index,
                            text,
                            speech,
                        }),
                        Err(e) => Err(ControlError::from(e)),
                    }
                }
                None => {
                    fetch_paragraph(
                        segmenter.as_ref(),
                        synthesizer.as_ref(),
                        paragraph_index,
                        &api_key,
                        &voice_id,
                        &tuning,
                    )
                    .await
                }
            };
            let _ = load_tx
                .send(LoadOutcome {
                    generation,
                    paragraph_index,
                    origin,
                    result,
                })
                .await;
        });
    }

    async fn handle_load_outcome(&mut self, outcome: LoadOutcome) {
        if outcome.generation != self.load_generation {
            debug!(
                target: "playback",
                paragraph = outcome.paragraph_index,
                generation = outcome.generation,
                "Dropping stale load result"
            );
            return;
        }
        match outcome.result {
            Ok(fetched) => match self.begin_playback(fetched).await {
                Ok(()) => {
                    if outcome.origin == LoadOrigin::AutoContinue {
                        self.metrics.record_auto_advance();
                    }
                    if let Some(reply) = self.pending_reply.take() {
                        let _ = reply.send(Ok(()));
                    }
                }
                Err(e) => self.fail_load(outcome.origin, e),
            },
            Err(e) => self.fail_load(outcome.origin, e),
        }
    }

    /// An explicit play failure is surfaced; an automatic one ends the
    /// session quietly.
    fn fail_load(&mut self, origin: LoadOrigin, error: ControlError) {
        self.metrics.record_synthesis_failure();
        match origin {
            LoadOrigin::Explicit => {
                warn!(target: "playback", error = %error, "Playback failed to start");
                let message = error.to_string();
                self.apply(|s| {
                    s.status = PlaybackStatus::Error;
                    s.error = Some(message);
                });
                if let Some(reply) = self.pending_reply.take() {
                    let _ = reply.send(Err(error));
                }
            }
            LoadOrigin::AutoContinue => {
                debug!(target: "playback", error = %error, "Auto-continue failed, stopping");
                self.apply(|s| {
                    s.status = PlaybackStatus::Idle;
                    s.current_time = 0.0;
                    s.sentence_index = 0;
                    s.word_index = 0;
                    s.error = None;
                });
            }
        }
    }

    /// Load fetched speech into the sink and start it.
    async fn begin_playback(&mut self, fetched: FetchedParagraph) -> Result<(), ControlError> {
        let paragraph = segment_paragraph(fetched.paragraph_index, &fetched.text);
        let alignment = Arc::new(fetched.speech.alignment);

        self.sink.load(&fetched.speech.audio).await?;
        self.sink.set_rate(self.state.speed).await?;
        self.sink.play().await?;

        let paragraph_index = fetched.paragraph_index;
        self.active = Some(ActiveParagraph {
            paragraph,
            alignment,
        });
        self.apply(|s| {
            s.status = PlaybackStatus::Playing;
            s.paragraph_index = paragraph_index;
            s.sentence_index = 0;
            s.word_index = 0;
            s.current_time = 0.0;
            s.error = None;
        });
        info!(target: "playback", paragraph = paragraph_index, "Playing paragraph");
        self.start_preload(paragraph_index + 1);
        Ok(())
    }

    fn start_preload(&mut self, next_index: usize) {
        let Ok((api_key, voice_id)) = self.credentials() else {
            return;
        };
        let ctx = PreloadContext {
            auto_continue: self.state.auto_continue,
            total_paragraphs: self.state.total_paragraphs,
            api_key,
            voice_id,
            tuning: VoiceTuning::default(),
        };
        self.preload.maybe_start(next_index, &ctx);
    }

    async fn handle_pause(&mut self) -> Result<(), ControlError> {
        if self.state.status != PlaybackStatus::Playing {
            return Err(ControlError::NotPlaying {
                status: self.state.status,
            });
        }
        self.sink.pause().await?;
        let elapsed = self.sink.elapsed();
        self.apply(|s| {
            s.status = PlaybackStatus::Paused;
            s.current_time = elapsed;
        });
        Ok(())
    }

    /// Tear everything down. Safe to call in any status; a stop during a
    /// load supersedes the loading caller.
    async fn handle_stop(&mut self) -> Result<(), ControlError> {
        self.load_generation += 1;
        if let Some(reply) = self.pending_reply.take() {
            let _ = reply.send(Err(ControlError::Superseded));
        }
        self.awaiting_preload = None;
        self.preload.invalidate();
        if let Err(e) = self.sink.unload().await {
            warn!(target: "playback", error = %e, "Failed to unload audio");
        }
        self.active = None;
        self.apply(|s| {
            s.status = PlaybackStatus::Idle;
            s.paragraph_index = 0;
            s.sentence_index = 0;
            s.word_index = 0;
            s.current_time = 0.0;
            s.error = None;
        });
        Ok(())
    }

    async fn handle_set_speed(&mut self, speed: f32) -> Result<(), ControlError> {
        if !speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(ControlError::SpeedOutOfRange(speed));
        }
        self.settings.speed = speed;
        self.persist_settings().await;
        self.sink.set_rate(speed).await?;
        self.apply(|s| s.speed = speed);
        Ok(())
    }

    async fn handle_jump(
        &mut self,
        paragraph_index: usize,
        text: String,
        reply: oneshot::Sender<Result<(), ControlError>>,
    ) {
        info!(target: "playback", paragraph = paragraph_index, "Jumping to paragraph");
        if let Err(e) = self.handle_stop().await {
            let _ = reply.send(Err(e));
            return;
        }
        self.handle_play(text, paragraph_index, reply).await;
    }

    async fn handle_set_auto_continue(&mut self, enabled: bool) -> Result<(), ControlError> {
        self.settings.auto_continue = enabled;
        self.persist_settings().await;
        // a continuation parked on the preload slot has nowhere to go once
        // continuation is off, so end the session instead of waiting forever
        let parked = !enabled && self.awaiting_preload.take().is_some();
        if !enabled {
            self.preload.invalidate();
        }
        self.apply(|s| {
            s.auto_continue = enabled;
            if parked {
                s.status = PlaybackStatus::Idle;
                s.current_time = 0.0;
                s.sentence_index = 0;
                s.word_index = 0;
                s.error = None;
            }
        });
        Ok(())
    }

    async fn handle_set_voice(&mut self, voice_id: String) -> Result<(), ControlError> {
        if voice_id.trim().is_empty() {
            return Err(ControlError::MissingVoice);
        }
        self.settings.voice_id = Some(voice_id);
        self.persist_settings().await;
        Ok(())
    }

    async fn handle_set_api_key(&mut self, api_key: String) -> Result<(), ControlError> {
        validate_api_key(Some(&api_key)).map_err(|_| ControlError::MissingApiKey)?;
        self.settings.api_key = Some(api_key);
        self.persist_settings().await;
        Ok(())
    }

    async fn persist_settings(&self) {
        if let Err(e) = self.settings_store.save(&self.settings).await {
            warn!(target: "settings", error = %e, "Failed to persist settings");
        }
    }

    /// Sample the sink clock, update position, emit a highlight frame.
    async fn handle_tick(&mut self) {
        if self.state.status != PlaybackStatus::Playing {
            return;
        }
        self.metrics.record_tick();

        if self.sink.is_finished() {
            self.handle_audio_ended().await;
            return;
        }

        let (t, position, frame) = {
            let Some(active) = self.active.as_ref() else {
                return;
            };
            let t = self.sink.elapsed();
            let position = map_time_to_position(
                t,
                &active.alignment,
                std::slice::from_ref(&active.paragraph),
                active.paragraph.index,
            );
            let frame = HighlightFrame {
                current_time: t,
                paragraph_offset: active.paragraph.index,
                alignment: Arc::clone(&active.alignment),
                position,
            };
            (t, position, frame)
        };

        self.apply(|s| {
            s.current_time = t;
            // between words the previous highlight stands
            if let Some(p) = position {
                s.sentence_index = p.sentence;
                s.word_index = p.word;
            }
        });
        let _ = self.highlight_tx.send(frame);
    }

    /// The current paragraph's audio ran out: stop, or advance when
    /// auto-continue has somewhere to go.
    async fn handle_audio_ended(&mut self) {
        let finished = self.state.paragraph_index;
        debug!(target: "playback", paragraph = finished, "Paragraph audio ended");
        self.active = None;
        if let Err(e) = self.sink.unload().await {
            warn!(target: "playback", error = %e, "Failed to unload audio");
        }

        let total = self.state.total_paragraphs;
        let last = total == 0 || finished + 1 >= total;
        if !self.state.auto_continue || last {
            self.preload.invalidate();
            self.apply(|s| {
                s.status = PlaybackStatus::Idle;
                s.current_time = 0.0;
                s.sentence_index = 0;
                s.word_index = 0;
            });
            info!(target: "playback", paragraph = finished, "Playback finished");
            return;
        }

        let next = finished + 1;
        match self.preload.consume(next) {
            PreloadLookup::Ready(fetched) => match self.begin_playback(fetched).await {
                Ok(()) => self.metrics.record_auto_advance(),
                Err(e) => self.fail_load(LoadOrigin::AutoContinue, e),
            },
            PreloadLookup::Pending => {
                self.awaiting_preload = Some(next);
                self.apply(|s| {
                    s.status = PlaybackStatus::Loading;
                    s.paragraph_index = next;
                    s.sentence_index = 0;
                    s.word_index = 0;
                    s.current_time = 0.0;
                    s.error = None;
                });
            }
            PreloadLookup::Miss => self.auto_load(next),
        }
    }

    /// Fresh auto-continue load for `index`, degrading quietly when it
    /// cannot even start.
    fn auto_load(&mut self, index: usize) {
        match self.credentials() {
            Ok(credentials) => {
                self.begin_load(index, None, LoadOrigin::AutoContinue, credentials)
            }
            Err(e) => {
                debug!(target: "playback", error = %e, "Cannot auto-continue without credentials");
                self.apply(|s| {
                    s.status = PlaybackStatus::Idle;
                    s.current_time = 0.0;
                    s.sentence_index = 0;
                    s.word_index = 0;
                });
            }
        }
    }

    async fn handle_preload_outcome(&mut self, outcome: PreloadOutcome) {
        let index = outcome.paragraph_index;
        let finish = self.preload.finish(outcome);

        // nobody is blocked on this preload, leave the slot as recorded
        let Some(waiting) = self.awaiting_preload else {
            return;
        };
        if waiting != index {
            return;
        }

        match finish {
            PreloadFinish::Stored(_) => {
                self.awaiting_preload = None;
                match self.preload.take_ready(index) {
                    Some(fetched) => match self.begin_playback(fetched).await {
                        Ok(()) => self.metrics.record_auto_advance(),
                        Err(e) => self.fail_load(LoadOrigin::AutoContinue, e),
                    },
                    None => self.auto_load(index),
                }
            }
            PreloadFinish::Failed(_) => {
                self.awaiting_preload = None;
                self.auto_load(index);
            }
            PreloadFinish::Stale => {}
        }
    }
}
