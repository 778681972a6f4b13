//! Next-paragraph preload.
//!
//! While a paragraph plays, the orchestrator fetches the next one in the
//! background so auto-continue can switch without a synthesis pause. One slot
//! only: starting a new preload cancels the old one. Every fetch carries a
//! generation number, a completion whose generation no longer matches the
//! slot is stale and dropped, which keeps rapid stop/jump sequences from
//! resurrecting cancelled audio.

use crate::error::ControlError;
use crate::metrics::PlaybackMetrics;
use lector_synth::{SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech, VoiceTuning};
use lector_text::TextSegmenter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A paragraph fetched end to end: text plus synthesized speech.
#[derive(Debug, Clone)]
pub struct FetchedParagraph {
    pub paragraph_index: usize,
    pub text: String,
    pub speech: SynthesizedSpeech,
}

/// Completion message from a background preload task.
#[derive(Debug)]
pub struct PreloadOutcome {
    pub paragraph_index: usize,
    pub generation: u64,
    pub result: Result<FetchedParagraph, ControlError>,
}

/// Snapshot of the orchestrator state a preload decision needs.
#[derive(Debug, Clone)]
pub struct PreloadContext {
    pub auto_continue: bool,
    pub total_paragraphs: usize,
    pub api_key: String,
    pub voice_id: String,
    pub tuning: VoiceTuning,
}

/// What the slot held when a paragraph was requested.
#[derive(Debug)]
pub enum PreloadLookup {
    /// Fetch completed, speech is ready to play.
    Ready(FetchedParagraph),
    /// Fetch for this paragraph is still in flight.
    Pending,
    /// Slot empty or holding a different paragraph.
    Miss,
}

/// Result of recording a completion against the slot.
#[derive(Debug, PartialEq, Eq)]
pub enum PreloadFinish {
    Stored(usize),
    Failed(usize),
    Stale,
}

struct PreloadSlot {
    paragraph_index: usize,
    generation: u64,
    ready: Option<FetchedParagraph>,
    task: Option<JoinHandle<()>>,
}

/// Owns the preload slot and the background fetch tasks that fill it.
pub struct PreloadManager {
    slot: Option<PreloadSlot>,
    generation: u64,
    outcome_tx: mpsc::Sender<PreloadOutcome>,
    segmenter: Arc<dyn TextSegmenter>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    metrics: PlaybackMetrics,
}

impl PreloadManager {
    pub fn new(
        segmenter: Arc<dyn TextSegmenter>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        metrics: PlaybackMetrics,
    ) -> (Self, mpsc::Receiver<PreloadOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::channel(8);
        let manager = Self {
            slot: None,
            generation: 0,
            outcome_tx,
            segmenter,
            synthesizer,
            metrics,
        };
        (manager, outcome_rx)
    }

    /// Paragraph currently occupying the slot, if any.
    pub fn slot_index(&self) -> Option<usize> {
        self.slot.as_ref().map(|s| s.paragraph_index)
    }

    /// Start fetching `next_index` unless preloading is pointless or already
    /// underway for that paragraph.
    pub fn maybe_start(&mut self, next_index: usize, ctx: &PreloadContext) {
        if !ctx.auto_continue {
            return;
        }
        if ctx.total_paragraphs == 0 || next_index >= ctx.total_paragraphs {
            return;
        }
        if self.slot_index() == Some(next_index) {
            return;
        }

        self.invalidate();
        self.generation += 1;
        let generation = self.generation;
        self.metrics.record_preload_started();
        debug!(target: "preload", paragraph = next_index, generation, "Preloading paragraph");

        let segmenter = Arc::clone(&self.segmenter);
        let synthesizer = Arc::clone(&self.synthesizer);
        let outcome_tx = self.outcome_tx.clone();
        let api_key = ctx.api_key.clone();
        let voice_id = ctx.voice_id.clone();
        let tuning = ctx.tuning.clone();

        let task = tokio::spawn(async move {
            let result = fetch_paragraph(
                segmenter.as_ref(),
                synthesizer.as_ref(),
                next_index,
                &api_key,
                &voice_id,
                &tuning,
            )
            .await;
            let _ = outcome_tx
                .send(PreloadOutcome {
                    paragraph_index: next_index,
                    generation,
                    result,
                })
                .await;
        });

        self.slot = Some(PreloadSlot {
            paragraph_index: next_index,
            generation,
            ready: None,
            task: Some(task),
        });
    }

    /// Record a background completion against the slot.
    pub fn finish(&mut self, outcome: PreloadOutcome) -> PreloadFinish {
        let matches = self
            .slot
            .as_ref()
            .map(|s| {
                s.paragraph_index == outcome.paragraph_index && s.generation == outcome.generation
            })
            .unwrap_or(false);
        if !matches {
            return PreloadFinish::Stale;
        }

        match outcome.result {
            Ok(fetched) => {
                if let Some(slot) = self.slot.as_mut() {
                    slot.ready = Some(fetched);
                    slot.task = None;
                }
                PreloadFinish::Stored(outcome.paragraph_index)
            }
            Err(e) => {
                debug!(
                    target: "preload",
                    paragraph = outcome.paragraph_index,
                    error = %e,
                    "Preload failed"
                );
                self.metrics.record_preload_failure();
                self.slot = None;
                PreloadFinish::Failed(outcome.paragraph_index)
            }
        }
    }

    /// Look up `index` at transition time, recording hit or miss.
    pub fn consume(&mut self, index: usize) -> PreloadLookup {
        match self.slot.take() {
            Some(slot) if slot.paragraph_index == index => {
                if let Some(fetched) = slot.ready {
                    self.metrics.record_preload_hit();
                    PreloadLookup::Ready(fetched)
                } else {
                    self.metrics.record_preload_pending_hit();
                    self.slot = Some(slot);
                    PreloadLookup::Pending
                }
            }
            other => {
                self.metrics.record_preload_miss();
                self.slot = other;
                PreloadLookup::Miss
            }
        }
    }

    /// Take a completed fetch for `index` out of the slot, if present.
    pub fn take_ready(&mut self, index: usize) -> Option<FetchedParagraph> {
        match self.slot.take() {
            Some(slot) if slot.paragraph_index == index && slot.ready.is_some() => slot.ready,
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// Drop the slot and cancel any in-flight fetch.
    pub fn invalidate(&mut self) {
        if let Some(slot) = self.slot.take() {
            if let Some(task) = slot.task {
                task.abort();
            }
            debug!(target: "preload", paragraph = slot.paragraph_index, "Preload invalidated");
        }
    }
}

/// Fetch paragraph text and synthesize it.
pub(crate) async fn fetch_paragraph(
    segmenter: &dyn TextSegmenter,
    synthesizer: &dyn SpeechSynthesizer,
    index: usize,
    api_key: &str,
    voice_id: &str,
    tuning: &VoiceTuning,
) -> Result<FetchedParagraph, ControlError> {
    let text = segmenter.paragraph_text(index).await?;
    let mut request = SynthesisRequest::new(api_key, &text, voice_id);
    request.tuning = tuning.clone();
    let speech = synthesizer.synthesize(&request).await?;
    Ok(FetchedParagraph {
        paragraph_index: index,
        text,
        speech,
    })
}
