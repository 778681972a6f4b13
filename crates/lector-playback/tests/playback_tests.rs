//! End-to-end orchestrator tests.
//!
//! A full player is spawned against an in-memory document, a scripted
//! synthesizer and a manually clocked sink, then driven through the public
//! handle exactly as an embedding UI would.

use lector_playback::{
    ControlError, MemorySettingsStore, OrchestratorConfig, PlaybackHandle, PlaybackOrchestrator,
    PlaybackSettings, PlaybackState, PlaybackStatus, SettingsStore, SimulatedSink, SinkController,
};
use lector_synth::{ScriptedConfig, ScriptedSynthesizer, BYTES_PER_SECOND};
use lector_text::StaticDocument;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

struct Harness {
    handle: PlaybackHandle,
    controller: SinkController,
    task: tokio::task::JoinHandle<()>,
}

async fn spawn_player(
    paragraphs: Vec<String>,
    synthesizer: Arc<ScriptedSynthesizer>,
    settings: PlaybackSettings,
) -> Harness {
    let store = Arc::new(MemorySettingsStore::new(settings));
    spawn_player_with_store(paragraphs, synthesizer, store).await
}

async fn spawn_player_with_store(
    paragraphs: Vec<String>,
    synthesizer: Arc<ScriptedSynthesizer>,
    store: Arc<dyn SettingsStore>,
) -> Harness {
    let segmenter = Arc::new(StaticDocument::new(paragraphs));
    let (sink, controller) = SimulatedSink::manual(BYTES_PER_SECOND);
    let (orchestrator, handle) = PlaybackOrchestrator::new(
        segmenter,
        synthesizer,
        Box::new(sink),
        store,
        OrchestratorConfig::default(),
    )
    .await;
    let task = tokio::spawn(orchestrator.run());
    Harness {
        handle,
        controller,
        task,
    }
}

fn ready_settings() -> PlaybackSettings {
    PlaybackSettings {
        api_key: Some("sk-test".to_string()),
        voice_id: Some("sarah".to_string()),
        ..Default::default()
    }
}

fn document(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("Paragraph {i} reads aloud. It has two sentences."))
        .collect()
}

async fn wait_for_state(
    handle: &PlaybackHandle,
    description: &str,
    predicate: impl Fn(&PlaybackState) -> bool,
) -> PlaybackState {
    let result = timeout(Duration::from_secs(5), async {
        loop {
            let state = handle.state().await.expect("orchestrator alive");
            if predicate(&state) {
                return state;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    match result {
        Ok(state) => state,
        Err(_) => panic!("timed out waiting for {description}"),
    }
}

async fn wait_for_status(handle: &PlaybackHandle, status: PlaybackStatus) -> PlaybackState {
    wait_for_state(handle, &format!("status {status:?}"), |s| s.status == status).await
}

// ──────────────────────────── Basic lifecycle ─────────────────────────────

#[tokio::test(start_paused = true)]
async fn play_reaches_playing_and_ticks_position() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    let state = harness.handle.state().await.unwrap();
    assert_eq!(state.status, PlaybackStatus::Playing);
    assert_eq!(state.paragraph_index, 0);

    // one second of audio at 15 chars/s lands in "reads"
    harness.controller.advance(1.0);
    let state = wait_for_state(&harness.handle, "position update", |s| {
        s.current_time >= 1.0
    })
    .await;
    assert!((state.current_time - 1.0).abs() < 1e-6);
    assert_eq!(state.sentence_index, 0);
    assert_eq!(state.word_index, 2);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn empty_text_is_rejected() {
    let harness = spawn_player(document(1), Arc::new(ScriptedSynthesizer::default()), ready_settings()).await;

    let result = harness.handle.play("   \n ", 0).await;
    assert_eq!(result, Err(ControlError::EmptyText));
    assert_eq!(
        harness.handle.state().await.unwrap().status,
        PlaybackStatus::Idle
    );

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn pause_requires_playing() {
    let harness = spawn_player(document(1), Arc::new(ScriptedSynthesizer::default()), ready_settings()).await;

    assert!(matches!(
        harness.handle.pause().await,
        Err(ControlError::NotPlaying {
            status: PlaybackStatus::Idle
        })
    ));

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn pause_then_play_resumes_in_place() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), Arc::clone(&synth), ready_settings()).await;

    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.advance(1.0);
    wait_for_state(&harness.handle, "position update", |s| s.current_time >= 1.0).await;

    harness.handle.pause().await.unwrap();
    let paused = harness.handle.state().await.unwrap();
    assert_eq!(paused.status, PlaybackStatus::Paused);
    assert!((paused.current_time - 1.0).abs() < 1e-6);

    // the clock must not move while paused
    harness.controller.advance(0.5);
    assert!((harness.controller.elapsed() - 1.0).abs() < 1e-6);

    let requests_before = synth.requests_made();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    let resumed = harness.handle.state().await.unwrap();
    assert_eq!(resumed.status, PlaybackStatus::Playing);
    assert_eq!(resumed.paragraph_index, 0);
    assert!((resumed.current_time - 1.0).abs() < 1e-6);
    assert_eq!(synth.requests_made(), requests_before);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn stop_resets_to_idle_from_any_point() {
    let paragraphs = document(3);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    // stop with nothing playing is a quiet no-op
    harness.handle.stop().await.unwrap();
    let idle = harness.handle.state().await.unwrap();
    assert_eq!(idle.status, PlaybackStatus::Idle);

    harness.handle.set_total_paragraphs(3).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.advance(1.0);
    wait_for_state(&harness.handle, "position update", |s| s.current_time >= 1.0).await;

    harness.handle.stop().await.unwrap();
    let stopped = harness.handle.state().await.unwrap();
    assert_eq!(stopped.status, PlaybackStatus::Idle);
    assert_eq!(stopped.paragraph_index, 0);
    assert_eq!(stopped.current_time, 0.0);
    assert_eq!(stopped.error, None);

    // any in-flight preload result must land without resurrecting playback
    sleep(Duration::from_millis(300)).await;
    assert_eq!(
        harness.handle.state().await.unwrap().status,
        PlaybackStatus::Idle
    );

    harness.task.abort();
}

// ───────────────────────── State and highlights ───────────────────────────

#[tokio::test(start_paused = true)]
async fn state_query_matches_the_broadcast_stream() {
    let paragraphs = document(2);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;
    let mut state_rx = harness.handle.subscribe_state();

    harness.handle.set_total_paragraphs(2).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.advance(0.5);
    wait_for_state(&harness.handle, "position update", |s| s.current_time >= 0.5).await;
    harness.handle.pause().await.unwrap();

    // replaying every snapshot must end exactly where a query lands
    let mut replayed = None;
    loop {
        match state_rx.try_recv() {
            Ok(state) => replayed = Some(state),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    let queried = harness.handle.state().await.unwrap();
    assert_eq!(replayed.expect("snapshots were broadcast"), queried);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn highlight_frames_follow_the_audio_clock() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;
    let mut highlight_rx = harness.handle.subscribe_highlights();

    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.advance(1.0);

    let frame = timeout(Duration::from_secs(5), async {
        loop {
            match highlight_rx.recv().await {
                Ok(frame) if frame.current_time >= 1.0 => return frame,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("highlight stream closed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a highlight frame");

    assert_eq!(frame.paragraph_offset, 0);
    let position = frame.position.expect("cursor is on a word");
    assert_eq!(position.sentence, 0);
    assert_eq!(position.word, 2);
    assert_eq!(frame.alignment.index_at(frame.current_time), Some(15));

    harness.task.abort();
}

// ─────────────────────────────── Speed ────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn speed_change_keeps_the_playback_position() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.advance(1.0);
    let before = wait_for_state(&harness.handle, "position update", |s| {
        s.current_time >= 1.0
    })
    .await;

    harness.handle.set_speed(2.0).await.unwrap();
    let after = harness.handle.state().await.unwrap();
    assert_eq!(after.speed, 2.0);
    assert_eq!(after.status, PlaybackStatus::Playing);
    assert!((after.current_time - before.current_time).abs() < 1e-6);
    assert_eq!(after.word_index, before.word_index);
    assert_eq!(after.sentence_index, before.sentence_index);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn out_of_range_speeds_are_rejected() {
    let harness = spawn_player(document(1), Arc::new(ScriptedSynthesizer::default()), ready_settings()).await;

    for bad in [0.49, 3.01, -1.0, f32::NAN, f32::INFINITY] {
        assert!(
            matches!(
                harness.handle.set_speed(bad).await,
                Err(ControlError::SpeedOutOfRange(_))
            ),
            "speed {bad} should be rejected"
        );
    }
    assert_eq!(harness.handle.state().await.unwrap().speed, 1.0);

    harness.handle.set_speed(0.5).await.unwrap();
    harness.handle.set_speed(3.0).await.unwrap();
    assert_eq!(harness.handle.state().await.unwrap().speed, 3.0);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn persisted_speed_is_sanitized_on_startup() {
    let mut settings = ready_settings();
    settings.speed = 99.0;
    let harness = spawn_player(document(1), Arc::new(ScriptedSynthesizer::default()), settings).await;
    assert_eq!(harness.handle.state().await.unwrap().speed, 3.0);
    harness.task.abort();

    let mut settings = ready_settings();
    settings.speed = f32::NAN;
    let harness = spawn_player(document(1), Arc::new(ScriptedSynthesizer::default()), settings).await;
    assert_eq!(harness.handle.state().await.unwrap().speed, 1.0);
    harness.task.abort();
}

// ──────────────────────────── Auto-continue ───────────────────────────────

#[tokio::test(start_paused = true)]
async fn auto_continue_advances_to_the_next_paragraph() {
    let paragraphs = document(3);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    harness.handle.set_total_paragraphs(3).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();

    harness.controller.finish();
    let state = wait_for_state(&harness.handle, "advance to paragraph 1", |s| {
        s.status == PlaybackStatus::Playing && s.paragraph_index == 1
    })
    .await;
    assert_eq!(state.current_time, 0.0);
    assert_eq!(state.word_index, 0);

    let metrics = harness.handle.metrics();
    assert_eq!(metrics.auto_advances.load(Ordering::Relaxed), 1);
    let served_from_preload = metrics.preload_hits.load(Ordering::Relaxed)
        + metrics.preload_pending_hits.load(Ordering::Relaxed);
    assert!(served_from_preload >= 1, "next paragraph came from the preload slot");

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn auto_continue_stops_at_the_document_end() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), Arc::clone(&synth), ready_settings()).await;

    harness.handle.set_total_paragraphs(1).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.finish();

    let state = wait_for_status(&harness.handle, PlaybackStatus::Idle).await;
    assert_eq!(state.error, None);
    assert_eq!(state.current_time, 0.0);

    // nothing past the last paragraph is ever requested
    assert_eq!(synth.requests_made(), 1);
    assert_eq!(
        harness
            .handle
            .metrics()
            .preloads_started
            .load(Ordering::Relaxed),
        0
    );

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn disabled_auto_continue_goes_idle_between_paragraphs() {
    let paragraphs = document(2);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let mut settings = ready_settings();
    settings.auto_continue = false;
    let harness = spawn_player(paragraphs.clone(), Arc::clone(&synth), settings).await;

    harness.handle.set_total_paragraphs(2).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.finish();

    let state = wait_for_status(&harness.handle, PlaybackStatus::Idle).await;
    assert_eq!(state.paragraph_index, 0);
    assert_eq!(synth.requests_made(), 1);
    assert_eq!(
        harness
            .handle
            .metrics()
            .preloads_started
            .load(Ordering::Relaxed),
        0
    );

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn disabling_auto_continue_mid_wait_ends_the_session() {
    let paragraphs = document(2);
    let synth = Arc::new(ScriptedSynthesizer::new(ScriptedConfig {
        processing_delay_ms: 600,
        ..Default::default()
    }));
    let harness = spawn_player(paragraphs.clone(), Arc::clone(&synth), ready_settings()).await;

    harness.handle.set_total_paragraphs(2).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();

    // the paragraph ends while its successor is still being synthesized,
    // which parks the player in loading until the preload lands
    harness.controller.finish();
    wait_for_status(&harness.handle, PlaybackStatus::Loading).await;

    harness.handle.set_auto_continue(false).await.unwrap();
    let state = harness.handle.state().await.unwrap();
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert_eq!(state.error, None);
    assert!(!state.auto_continue);

    // the cancelled preload must not come back to life later
    sleep(Duration::from_secs(1)).await;
    assert_eq!(
        harness.handle.state().await.unwrap().status,
        PlaybackStatus::Idle
    );
    assert_eq!(synth.requests_made(), 2);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn jump_restarts_at_the_target_paragraph() {
    let paragraphs = document(5);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    harness.handle.set_total_paragraphs(5).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.advance(1.0);
    wait_for_state(&harness.handle, "position update", |s| s.current_time >= 1.0).await;

    harness
        .handle
        .jump_to_paragraph(3, paragraphs[3].as_str())
        .await
        .unwrap();
    let state = harness.handle.state().await.unwrap();
    assert_eq!(state.status, PlaybackStatus::Playing);
    assert_eq!(state.paragraph_index, 3);
    assert_eq!(state.current_time, 0.0);

    // auto-continue picks up from the jump target, not the old position
    harness.controller.finish();
    wait_for_state(&harness.handle, "advance to paragraph 4", |s| {
        s.status == PlaybackStatus::Playing && s.paragraph_index == 4
    })
    .await;

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn auto_continue_failure_ends_the_session_quietly() {
    let paragraphs = document(2);
    let synth = Arc::new(ScriptedSynthesizer::new(ScriptedConfig {
        fail_after_requests: Some(1),
        fail_status: 500,
        ..Default::default()
    }));
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    harness.handle.set_total_paragraphs(2).await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    harness.controller.finish();

    // no error state for a background failure, just a quiet stop
    let state = wait_for_status(&harness.handle, PlaybackStatus::Idle).await;
    assert_eq!(state.error, None);

    let metrics = harness.handle.metrics();
    assert!(metrics.preload_failures.load(Ordering::Relaxed) >= 1);
    assert!(metrics.synthesis_failures.load(Ordering::Relaxed) >= 1);

    harness.task.abort();
}

// ──────────────────────────── Error handling ──────────────────────────────

#[tokio::test(start_paused = true)]
async fn missing_api_key_is_rejected_before_any_request() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let settings = PlaybackSettings {
        api_key: None,
        voice_id: Some("sarah".to_string()),
        ..Default::default()
    };
    let harness = spawn_player(paragraphs.clone(), Arc::clone(&synth), settings).await;

    let result = harness.handle.play(paragraphs[0].as_str(), 0).await;
    assert_eq!(result, Err(ControlError::MissingApiKey));
    assert_eq!(
        harness.handle.state().await.unwrap().status,
        PlaybackStatus::Idle
    );
    assert_eq!(synth.requests_made(), 0);

    // blank keys are as useless as absent ones
    assert_eq!(
        harness.handle.set_api_key("").await,
        Err(ControlError::MissingApiKey)
    );
    assert_eq!(
        harness.handle.set_api_key("   ").await,
        Err(ControlError::MissingApiKey)
    );

    harness.handle.set_api_key("sk-test").await.unwrap();
    harness
        .handle
        .play(paragraphs[0].as_str(), 0)
        .await
        .unwrap();
    assert_eq!(synth.requests_made(), 1);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn missing_voice_is_rejected_before_any_request() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::default());
    let settings = PlaybackSettings {
        api_key: Some("sk-test".to_string()),
        voice_id: None,
        ..Default::default()
    };
    let harness = spawn_player(paragraphs.clone(), Arc::clone(&synth), settings).await;

    let result = harness.handle.play(paragraphs[0].as_str(), 0).await;
    assert_eq!(result, Err(ControlError::MissingVoice));
    assert_eq!(synth.requests_made(), 0);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn explicit_play_failure_surfaces_an_error_state() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::failing(500));
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    let result = harness.handle.play(paragraphs[0].as_str(), 0).await;
    assert!(matches!(result, Err(ControlError::Synthesis(_))));

    let state = harness.handle.state().await.unwrap();
    assert_eq!(state.status, PlaybackStatus::Error);
    let message = state.error.expect("error message is surfaced");
    assert!(message.contains("generation failed"));

    // stop clears the error state
    harness.handle.stop().await.unwrap();
    let cleared = harness.handle.state().await.unwrap();
    assert_eq!(cleared.status, PlaybackStatus::Idle);
    assert_eq!(cleared.error, None);

    harness.task.abort();
}

#[tokio::test(start_paused = true)]
async fn play_while_loading_is_rejected_as_busy() {
    let paragraphs = document(1);
    let synth = Arc::new(ScriptedSynthesizer::new(ScriptedConfig {
        processing_delay_ms: 500,
        ..Default::default()
    }));
    let harness = spawn_player(paragraphs.clone(), synth, ready_settings()).await;

    let first = {
        let handle = harness.handle.clone();
        let text = paragraphs[0].clone();
        tokio::spawn(async move { handle.play(text, 0).await })
    };
    wait_for_status(&harness.handle, PlaybackStatus::Loading).await;

    let second = harness.handle.play(paragraphs[0].as_str(), 0).await;
    assert!(matches!(
        second,
        Err(ControlError::Busy {
            status: PlaybackStatus::Loading
        })
    ));

    // the original request is unaffected by the rejection
    assert_eq!(first.await.unwrap(), Ok(()));
    assert_eq!(
        harness.handle.state().await.unwrap().status,
        PlaybackStatus::Playing
    );

    harness.task.abort();
}

// ────────────────────────────── Settings ──────────────────────────────────

#[tokio::test(start_paused = true)]
async fn control_operations_persist_their_settings() {
    let store = Arc::new(MemorySettingsStore::new(ready_settings()));
    let harness = spawn_player_with_store(
        document(1),
        Arc::new(ScriptedSynthesizer::default()),
        Arc::clone(&store) as Arc<dyn SettingsStore>,
    )
    .await;

    harness.handle.set_speed(1.5).await.unwrap();
    harness.handle.set_auto_continue(false).await.unwrap();
    harness.handle.set_voice("george").await.unwrap();
    harness.handle.set_api_key("sk-other").await.unwrap();

    let persisted = store.load().await;
    assert_eq!(persisted.speed, 1.5);
    assert!(!persisted.auto_continue);
    assert_eq!(persisted.voice_id.as_deref(), Some("george"));
    assert_eq!(persisted.api_key.as_deref(), Some("sk-other"));

    harness.task.abort();
}
