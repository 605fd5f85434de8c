mod config;
mod questions;
mod speech_adapter;

use crate::config::{
    BRIDGE_CHANNEL_CAPACITY, BRIDGE_HANDSHAKE_SECS, CAPTURE_HANDSHAKE_SECS,
    COMMAND_CHANNEL_CAPACITY, Config, INPUT_CHANNEL_CAPACITY, TEARDOWN_GRACE_SECS,
};
use crate::speech_adapter::BridgeSpeech;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing_subscriber::fmt::time::ChronoLocal;
use vigil_bridge::types::{ServerEvent, SignalKind};
use vigil_bridge::{Client, ServerRx};
use vigil_core::Command;
use vigil_core::integrity::IntegrityMonitor;
use vigil_core::persistence::PersistenceGateway;
use vigil_core::session::{InterviewSession, SessionPhase};
use vigil_core::signal::{GazeTicker, RawSignal, SignalSource, Subscription};
use vigil_core::speech::{RecognitionSegment, SpeechCoordinator};
use vigil_store::DocStore;

/// Inputs multiplexed into the session loop. Every handler runs to
/// completion there, so all session state mutates on one logical thread.
#[derive(Debug)]
enum Input {
    Recognition { is_final: bool, text: String },
    Signal(RawSignal),
    /// The candidate asked for the next question.
    Advance,
    /// Force the session to finish (link loss, Ctrl-C).
    Terminate(&'static str),
    /// Outcome of a spawned best-effort persistence write.
    PersistFailed {
        what: &'static str,
        error: String,
    },
}

#[derive(Parser)]
struct Cli {
    /// The session document id to run
    session_id: String,

    /// Optional JSON file with the question list (an array of strings)
    #[arg(long)]
    questions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load service configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    tracing::info!(session = %args.session_id, "Starting proctored interview session...");

    // --- 4. Load Questions ---
    let question_set = match &args.questions {
        Some(path) => questions::load_questions(path).context("Failed to load question file")?,
        None => questions::default_questions(),
    };
    tracing::info!("Loaded {} questions.", question_set.len());

    // --- 5. Persistence Gateway ---
    let store = Arc::new(DocStore::new(config.store_url, config.store_api_key));

    // --- 6. Companion Link ---
    let bridge_config = vigil_bridge::Config::new().with_session_id(&args.session_id);
    let mut client = vigil_bridge::connect_with_config(BRIDGE_CHANNEL_CAPACITY, bridge_config)
        .await
        .context("Failed to connect to the companion bridge")?;

    // Two subscriptions: one consumed by the startup handshake below, one
    // pumped into the session loop for the whole session.
    let mut handshake_events = client
        .server_events()
        .context("Failed to subscribe to bridge events")?;
    let pump_events = client
        .server_events()
        .context("Failed to subscribe to bridge events")?;

    // --- 7. Channels and the Event Pump ---
    let (input_tx, input_rx) = mpsc::channel::<Input>(INPUT_CHANNEL_CAPACITY);
    let (command_tx, command_rx) = mpsc::channel::<Command>(COMMAND_CHANNEL_CAPACITY);

    let _pump = spawn_event_pump(pump_events, input_tx.clone());

    // --- 8. Voice and Capture Handshake ---
    // Runs to completion before the session starts, so a capture failure is
    // always on record before the first question is spoken.
    let voices = bridge_handshake(&mut handshake_events, &mut client, &input_tx).await?;
    drop(handshake_events);

    let speech = BridgeSpeech::new(client.outbound()?, voices);
    let coordinator = SpeechCoordinator::new(speech, config.preferred_voice.clone());

    // This task executes side effects on behalf of the core logic.
    let command_handler = tokio::spawn(run_commands(
        command_rx,
        client,
        coordinator,
        store,
        args.session_id.clone(),
        input_tx.clone(),
    ));

    // --- 9. Gaze Sampling ---
    let (signal_tx, mut signal_rx) = mpsc::channel::<RawSignal>(32);
    let mut gaze_ticker = GazeTicker::default();
    let _gaze_subscription = gaze_ticker.subscribe(signal_tx);
    let signal_input_tx = input_tx.clone();
    let _signal_pump = Subscription::from_task(tokio::spawn(async move {
        while let Some(signal) = signal_rx.recv().await {
            if signal_input_tx.send(Input::Signal(signal)).await.is_err() {
                break;
            }
        }
    }));

    // --- 10. Session Loop ---
    let session = InterviewSession::new(question_set);
    let monitor = IntegrityMonitor::new();
    let mut session_task = tokio::spawn(run_session(input_rx, command_tx, session, monitor));

    tokio::select! {
        result = &mut session_task => {
            result.context("Session loop panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
            let _ = input_tx.send(Input::Terminate("interrupted")).await;
            session_task.await.context("Session loop panicked")??;
        }
    }

    // --- 11. Teardown ---
    // The loop exit dropped the command channel; the handler drains what is
    // left, stops recognition, and releases capture. The gaze ticker and the
    // event pump abort when their subscription guards drop at the end of
    // this scope, whichever way we got here.
    drop(input_tx);
    if timeout(Duration::from_secs(TEARDOWN_GRACE_SECS), command_handler)
        .await
        .is_err()
    {
        tracing::warn!("Command handler did not drain in time");
    }
    tracing::info!("Shutting down...");
    Ok(())
}

/// Waits for the companion to announce itself, then acquires media capture.
///
/// Either step can fail without ending the session: a missing companion
/// degrades speech to a no-op, and a capture denial is recorded as a single
/// high-severity integrity event while the interview continues without
/// video.
async fn bridge_handshake(
    events: &mut ServerRx,
    client: &mut Client,
    input_tx: &mpsc::Sender<Input>,
) -> Result<Vec<String>> {
    let created = timeout(
        Duration::from_secs(BRIDGE_HANDSHAKE_SECS),
        wait_for_session_created(events),
    )
    .await;
    let voices = match created {
        Ok(Some(voices)) => voices,
        Ok(None) | Err(_) => {
            tracing::warn!("Companion never announced itself; running without speech or capture");
            input_tx
                .send(Input::Signal(RawSignal::CaptureFailed))
                .await
                .context("Input channel closed during handshake")?;
            return Ok(Vec::new());
        }
    };
    tracing::info!("Companion announced {} synthesis voices", voices.len());

    client
        .capture_start(true, true)
        .await
        .context("Failed to request media capture")?;
    let acquired = timeout(
        Duration::from_secs(CAPTURE_HANDSHAKE_SECS),
        wait_for_capture(events),
    )
    .await;
    match acquired {
        Ok(Some(true)) => tracing::info!("Media capture acquired"),
        Ok(Some(false)) | Ok(None) | Err(_) => {
            tracing::warn!("Media capture unavailable; continuing without video");
            input_tx
                .send(Input::Signal(RawSignal::CaptureFailed))
                .await
                .context("Input channel closed during handshake")?;
        }
    }
    Ok(voices)
}

async fn wait_for_session_created(events: &mut ServerRx) -> Option<Vec<String>> {
    loop {
        match events.recv().await {
            Ok(ServerEvent::SessionCreated { voices }) => return Some(voices),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn wait_for_capture(events: &mut ServerRx) -> Option<bool> {
    loop {
        match events.recv().await {
            Ok(ServerEvent::CaptureReady) => return Some(true),
            Ok(ServerEvent::CaptureDenied { reason }) => {
                tracing::warn!(?reason, "Capture denied by companion");
                return Some(false);
            }
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Forwards companion events into the session loop as inputs. Handshake
/// events are consumed by startup and skipped here.
fn spawn_event_pump(mut events: ServerRx, input_tx: mpsc::Sender<Input>) -> Subscription {
    let handle = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let input = match event {
                        ServerEvent::RecognitionResult { is_final, text } => {
                            Some(Input::Recognition { is_final, text })
                        }
                        ServerEvent::Signal { kind } => Some(Input::Signal(map_signal(kind))),
                        ServerEvent::AdvanceRequested => Some(Input::Advance),
                        ServerEvent::Error { message } => {
                            tracing::warn!("Companion reported an error: {message}");
                            None
                        }
                        ServerEvent::Close { reason } => {
                            tracing::info!(?reason, "Companion link closed");
                            let _ = input_tx.send(Input::Terminate("companion link closed")).await;
                            break;
                        }
                        ServerEvent::SessionCreated { .. }
                        | ServerEvent::CaptureReady
                        | ServerEvent::CaptureDenied { .. } => None,
                    };
                    if let Some(input) = input {
                        if input_tx.send(input).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Bridge event stream lagging");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let _ = input_tx
                        .send(Input::Terminate("bridge event stream ended"))
                        .await;
                    break;
                }
            }
        }
    });
    Subscription::from_task(handle)
}

fn map_signal(kind: SignalKind) -> RawSignal {
    match kind {
        SignalKind::VisibilityHidden => RawSignal::VisibilityHidden,
        SignalKind::FocusLost => RawSignal::FocusLost,
        SignalKind::ClipboardCopy => RawSignal::ClipboardCopy,
        SignalKind::ClipboardPaste => RawSignal::ClipboardPaste,
        SignalKind::PointerEnter => RawSignal::PointerEnter,
        SignalKind::PointerLeave => RawSignal::PointerLeave,
    }
}

/// The session loop: the single place where session state mutates.
///
/// Multiplexes the input channel with the banner's one expiry deadline, so
/// a stale clear can never race a newer warning.
async fn run_session(
    mut input_rx: mpsc::Receiver<Input>,
    command_tx: mpsc::Sender<Command>,
    mut session: InterviewSession,
    mut monitor: IntegrityMonitor,
) -> Result<()> {
    session.start(&command_tx).await?;

    loop {
        let deadline = monitor.banner().deadline();
        tokio::select! {
            maybe_input = input_rx.recv() => {
                let Some(input) = maybe_input else { break };
                if let Err(e) = handle_input(input, &mut session, &mut monitor, &command_tx).await {
                    // Contract violations and channel failures are internal
                    // faults, not environmental degradation: end the session.
                    tracing::error!("Fatal session error: {e:?}");
                    let _ = session.finish(&command_tx).await;
                    break;
                }
                if session.phase() == SessionPhase::Finished {
                    break;
                }
            }
            _ = sleep_until(deadline), if deadline.is_some() => {
                if monitor.expire_banner(Utc::now())
                    && command_tx.send(Command::ClearBanner).await.is_err()
                {
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn handle_input(
    input: Input,
    session: &mut InterviewSession,
    monitor: &mut IntegrityMonitor,
    command_tx: &mpsc::Sender<Command>,
) -> Result<()> {
    match input {
        Input::Recognition { is_final, text } => {
            let segment = RecognitionSegment { is_final, text };
            // Interim partials are discarded here and never stored.
            if let Some(text) = segment.final_text() {
                tracing::debug!("Candidate said: {text:?}");
                session.push_answer_segment(text);
            }
        }
        Input::Signal(signal) => monitor.on_signal(signal, Utc::now(), command_tx).await?,
        Input::Advance => session.advance(Utc::now(), command_tx).await?,
        Input::Terminate(reason) => {
            tracing::info!("Terminating session: {reason}");
            session.finish(command_tx).await?;
        }
        Input::PersistFailed { what, error } => {
            // Best-effort writes: logged locally, never retried, never
            // surfaced to the candidate.
            tracing::warn!("Best-effort {what} write failed: {error}");
        }
    }
    Ok(())
}

fn sleep_until(deadline: Option<DateTime<Utc>>) -> impl Future<Output = ()> {
    let wait = deadline
        .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
        .unwrap_or(Duration::MAX);
    tokio::time::sleep(wait)
}

/// Executes side effects on behalf of the core logic: speech, banner
/// updates, and spawned best-effort persistence writes whose failures come
/// back to the session loop as inputs.
async fn run_commands(
    mut command_rx: mpsc::Receiver<Command>,
    mut client: Client,
    mut coordinator: SpeechCoordinator<BridgeSpeech>,
    store: Arc<DocStore>,
    session_id: String,
    input_tx: mpsc::Sender<Input>,
) {
    while let Some(command) = command_rx.recv().await {
        match command {
            Command::Speak(text) => {
                if let Err(e) = coordinator.speak(&text).await {
                    tracing::warn!("Question synthesis failed: {e:?}");
                }
            }
            Command::SpeakWarning(text) => {
                // One-shot, no retry; the warning just goes unheard.
                if let Err(e) = coordinator.speak(&text).await {
                    tracing::debug!("Warning synthesis failed: {e:?}");
                }
            }
            Command::ListenStart => {
                if let Err(e) = coordinator.begin_listening().await {
                    tracing::warn!("Failed to start recognition: {e:?}");
                }
            }
            Command::ListenStop => coordinator.end_listening().await,
            Command::ShowBanner(message) => {
                if let Err(e) = client.banner_update(Some(message)).await {
                    tracing::warn!("Failed to update warning banner: {e:?}");
                }
            }
            Command::ClearBanner => {
                if let Err(e) = client.banner_update(None).await {
                    tracing::warn!("Failed to clear warning banner: {e:?}");
                }
            }
            Command::PersistFlags(flags) => {
                let store = store.clone();
                let id = session_id.clone();
                spawn_write("flag summary", input_tx.clone(), async move {
                    store.write_flag_summary(&id, &flags).await
                });
            }
            Command::PersistTranscript(entry) => {
                let store = store.clone();
                let id = session_id.clone();
                spawn_write("transcript", input_tx.clone(), async move {
                    store.append_transcript_entry(&id, &entry).await
                });
            }
            Command::Finalize { status, summary } => {
                let store = store.clone();
                let id = session_id.clone();
                spawn_write("finalize", input_tx.clone(), async move {
                    store.finalize_session(&id, &status, &summary).await
                });
            }
            Command::SessionComplete => {
                // Hand control back to the companion's results view. After
                // this no further session calls are valid.
                if let Err(e) = client.session_complete().await {
                    tracing::debug!("Companion already gone: {e:?}");
                }
            }
        }
    }

    // Command channel closed: the session loop is done. Release the
    // companion-side resources on the way out, exactly once.
    coordinator.end_listening().await;
    if let Err(e) = client.capture_stop().await {
        tracing::debug!("Capture release skipped: {e:?}");
    }
}

/// Fire-and-forget persistence write; the outcome is reported back into the
/// session loop instead of being awaited here.
fn spawn_write<F>(what: &'static str, input_tx: mpsc::Sender<Input>, write: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = write.await {
            let error = format!("{e:#}");
            if input_tx
                .send(Input::PersistFailed {
                    what,
                    error: error.clone(),
                })
                .await
                .is_err()
            {
                // The loop is gone; log directly so the failure is not lost.
                tracing::warn!("Best-effort {what} write failed: {error}");
            }
        }
    });
}
