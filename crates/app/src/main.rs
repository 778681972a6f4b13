//! Headless read-aloud demo.
//!
//! Spawns the playback orchestrator against a built-in document, a scripted
//! synthesizer and a realtime simulated sink, then follows the state and
//! highlight streams until the document has been read.

use anyhow::Result;
use clap::Parser;
use lector_playback::{
    MemorySettingsStore, OrchestratorConfig, PlaybackOrchestrator, PlaybackStatus, SettingsStore,
    SimulatedSink, TextPosition, TomlSettingsStore,
};
use lector_synth::{ScriptedConfig, ScriptedSynthesizer, BYTES_PER_SECOND};
use lector_text::StaticDocument;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lector", about = "Read a built-in document aloud through the playback engine")]
struct Args {
    /// Playback speed multiplier.
    #[arg(long, default_value_t = 1.0)]
    speed: f32,

    /// Voice to read with.
    #[arg(long, default_value = "sarah")]
    voice: String,

    /// Speaking rate of the scripted synthesizer.
    #[arg(long, default_value_t = 120.0)]
    chars_per_second: f32,

    /// Read only the first paragraph instead of the whole document.
    #[arg(long)]
    no_auto_continue: bool,

    /// Settings file; settings stay in memory when omitted.
    #[arg(long, env = "LECTOR_SETTINGS")]
    settings: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn demo_paragraphs() -> Vec<String> {
    vec![
        "Reading aloud turns a page of text into a stream of audio. Each paragraph \
         is synthesized on its own, so the player can start speaking long before \
         the document ends."
            .to_string(),
        "While one paragraph plays, the next is fetched in the background. When the \
         audio runs out, playback rolls straight into the preloaded paragraph \
         without a pause."
            .to_string(),
        "Every character of synthesized speech carries a timestamp. The player maps \
         the audio clock back onto words, which is what drives the moving highlight."
            .to_string(),
        "And when the last paragraph finishes, the player simply returns to idle, \
         ready for the next document."
            .to_string(),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let paragraphs = demo_paragraphs();
    let segmenter = Arc::new(StaticDocument::new(paragraphs.clone()));
    let synthesizer = Arc::new(ScriptedSynthesizer::new(ScriptedConfig {
        chars_per_second: args.chars_per_second,
        ..Default::default()
    }));
    let sink = Box::new(SimulatedSink::realtime(BYTES_PER_SECOND));

    let store: Arc<dyn SettingsStore> = match &args.settings {
        Some(path) => Arc::new(TomlSettingsStore::new(path)),
        None => Arc::new(MemorySettingsStore::default()),
    };
    let mut settings = store.load().await;
    settings
        .api_key
        .get_or_insert_with(|| "demo-key".to_string());
    settings.voice_id = Some(args.voice.clone());
    settings.auto_continue = !args.no_auto_continue;
    store.save(&settings).await?;

    let (orchestrator, handle) = PlaybackOrchestrator::new(
        segmenter,
        synthesizer,
        sink,
        store,
        OrchestratorConfig::default(),
    )
    .await;

    let mut state_rx = handle.subscribe_state();
    let mut highlight_rx = handle.subscribe_highlights();
    let task = tokio::spawn(orchestrator.run());

    handle.set_total_paragraphs(paragraphs.len()).await?;
    handle.set_speed(args.speed).await?;
    handle.play(paragraphs[0].as_str(), 0).await?;
    info!(paragraphs = paragraphs.len(), speed = args.speed, "Reading started");

    let mut last_logged: Option<(PlaybackStatus, usize)> = None;
    let mut last_word: Option<TextPosition> = None;
    loop {
        tokio::select! {
            state = state_rx.recv() => {
                match state {
                    Ok(state) => {
                        let signature = (state.status, state.paragraph_index);
                        if last_logged == Some(signature) {
                            continue;
                        }
                        debug!(snapshot = %serde_json::to_string(&state)?, "State changed");
                        info!(status = ?state.status, paragraph = state.paragraph_index, "Player state");
                        if state.status == PlaybackStatus::Error {
                            let message = state.error.unwrap_or_else(|| "unknown".to_string());
                            anyhow::bail!("playback failed: {message}");
                        }
                        if state.status == PlaybackStatus::Idle && last_logged.is_some() {
                            break;
                        }
                        last_logged = Some(signature);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "State stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            frame = highlight_rx.recv() => {
                if let Ok(frame) = frame {
                    if frame.position != last_word {
                        if let Some(position) = frame.position {
                            debug!(
                                paragraph = position.paragraph,
                                sentence = position.sentence,
                                word = position.word,
                                t = frame.current_time,
                                "Highlight"
                            );
                        }
                        last_word = frame.position;
                    }
                }
            }
        }
    }

    info!("Document finished");
    drop(handle);
    task.await?;
    Ok(())
}
