use crate::Command;
use crate::signal::RawSignal;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// The event log never holds more than this many entries; older entries are
/// evicted first-in-first-out.
pub const EVENT_LOG_CAPACITY: usize = 10;

/// How long the warning banner stays up after the most recent event.
pub const WARNING_BANNER_TTL_SECS: i64 = 4;

/// Spoken to the candidate whenever an integrity event is recorded.
pub const AUDIBLE_WARNING: &str = "Please focus on the screen.";

const DESC_TAB_SWITCH: &str = "switched tabs or minimized";
const DESC_FOCUS_LOST: &str = "window focus lost";
const DESC_CLIPBOARD: &str = "clipboard activity detected";
const DESC_LOOKING_AWAY: &str = "gaze drifted off-screen";
const DESC_CAPTURE_FAILED: &str = "capture permission denied or unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    TabSwitch,
    FocusLost,
    CopyPaste,
    LookingAway,
}

/// Ordered so that `Low < Medium < High`; serializes as the capitalized
/// name the document store expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

/// A timestamped record of one suspected cheating behavior. Immutable once
/// constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: IntegrityKind,
    pub description: String,
    pub severity: Severity,
}

/// Newest-first log of integrity events, bounded at `EVENT_LOG_CAPACITY`.
#[derive(Debug, Default)]
pub struct EventLog {
    events: VecDeque<IntegrityEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: IntegrityEvent) {
        self.events.push_front(event);
        self.events.truncate(EVENT_LOG_CAPACITY);
    }

    /// Iterates newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &IntegrityEvent> {
        self.events.iter()
    }

    pub fn front(&self) -> Option<&IntegrityEvent> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Whether the candidate's pointer is inside the viewport. A proxy for eye
/// tracking; see the periodic tick handling in `IntegrityMonitor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GazeState {
    #[default]
    Focused,
    Distracted,
}

/// The transient on-screen warning. A single `expires_at` field is the only
/// authority on when the banner clears; every new event overwrites it, so a
/// stale clear can never race a newer warning.
#[derive(Debug, Default)]
pub struct WarningBanner {
    message: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl WarningBanner {
    /// Shows `message` and pushes the expiry out to now + TTL,
    /// superseding any pending clear.
    pub fn raise(&mut self, message: String, now: DateTime<Utc>) {
        self.message = Some(message);
        self.expires_at = Some(now + TimeDelta::seconds(WARNING_BANNER_TTL_SECS));
    }

    /// Clears the banner if the deadline has passed. Returns true when the
    /// banner was actually cleared by this call.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) if now >= at => {
                self.message = None;
                self.expires_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// The running flag summary persisted best-effort after every event: the
/// total number of events ever recorded (not the capped log length) and the
/// highest severity observed so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagSummary {
    pub count: u32,
    pub severity: Severity,
}

/// Merges raw proctoring signals into typed integrity events.
///
/// Owns the event log, the gaze proxy, and the warning banner; nothing else
/// mutates them. Signal handlers run to completion on the session's single
/// logical thread, so each signal is processed atomically.
#[derive(Debug, Default)]
pub struct IntegrityMonitor {
    log: EventLog,
    gaze: GazeState,
    banner: WarningBanner,
    flagged_total: u32,
    peak_severity: Option<Severity>,
}

impl IntegrityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one raw signal occurrence.
    ///
    /// Pointer signals only flip the gaze proxy. Everything that classifies
    /// to an event is recorded unconditionally; duplicates are never
    /// dropped, and a sustained distracted gaze re-flags on every tick.
    /// Each recorded event updates the log and banner, then asks the
    /// runtime to speak the audible warning and to persist the running
    /// flag summary, both fire-and-forget.
    pub async fn on_signal(
        &mut self,
        signal: RawSignal,
        now: DateTime<Utc>,
        command_tx: &tokio::sync::mpsc::Sender<Command>,
    ) -> Result<()> {
        let Some((kind, description, severity)) = self.classify(signal) else {
            return Ok(());
        };

        tracing::info!(?kind, %severity, "integrity event: {}", description);

        self.flagged_total += 1;
        self.peak_severity = Some(match self.peak_severity {
            Some(peak) => peak.max(severity),
            None => severity,
        });
        self.log.push(IntegrityEvent {
            timestamp: now,
            kind,
            description: description.to_string(),
            severity,
        });
        self.banner.raise(description.to_string(), now);

        command_tx
            .send(Command::ShowBanner(description.to_string()))
            .await
            .context("Failed to send ShowBanner command")?;
        command_tx
            .send(Command::SpeakWarning(AUDIBLE_WARNING.to_string()))
            .await
            .context("Failed to send SpeakWarning command")?;
        command_tx
            .send(Command::PersistFlags(self.flag_summary()))
            .await
            .context("Failed to send PersistFlags command")?;
        Ok(())
    }

    /// Maps a raw signal to its event triple, or updates internal state and
    /// returns None for signals that never emit directly.
    fn classify(&mut self, signal: RawSignal) -> Option<(IntegrityKind, &'static str, Severity)> {
        match signal {
            RawSignal::VisibilityHidden => {
                Some((IntegrityKind::TabSwitch, DESC_TAB_SWITCH, Severity::High))
            }
            RawSignal::FocusLost => {
                Some((IntegrityKind::FocusLost, DESC_FOCUS_LOST, Severity::Medium))
            }
            RawSignal::ClipboardCopy | RawSignal::ClipboardPaste => {
                Some((IntegrityKind::CopyPaste, DESC_CLIPBOARD, Severity::Medium))
            }
            RawSignal::PointerLeave => {
                self.gaze = GazeState::Distracted;
                None
            }
            RawSignal::PointerEnter => {
                self.gaze = GazeState::Focused;
                None
            }
            RawSignal::GazeTick => (self.gaze == GazeState::Distracted).then_some((
                IntegrityKind::LookingAway,
                DESC_LOOKING_AWAY,
                Severity::Medium,
            )),
            RawSignal::CaptureFailed => Some((
                IntegrityKind::FocusLost,
                DESC_CAPTURE_FAILED,
                Severity::High,
            )),
        }
    }

    /// Clears the banner if its deadline has passed; true when cleared.
    pub fn expire_banner(&mut self, now: DateTime<Utc>) -> bool {
        self.banner.expire_if_due(now)
    }

    pub fn flag_summary(&self) -> FlagSummary {
        FlagSummary {
            count: self.flagged_total,
            severity: self.peak_severity.unwrap_or(Severity::Low),
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn gaze(&self) -> GazeState {
        self.gaze
    }

    pub fn banner(&self) -> &WarningBanner {
        &self.banner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::Receiver<Command>) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    async fn feed(
        monitor: &mut IntegrityMonitor,
        signals: &[(RawSignal, DateTime<Utc>)],
    ) -> Vec<Command> {
        let (tx, mut rx) = mpsc::channel(256);
        for (signal, at) in signals {
            monitor.on_signal(*signal, *at, &tx).await.unwrap();
        }
        drain(&mut rx)
    }

    #[tokio::test]
    async fn test_event_log_is_bounded_and_newest_first() {
        let mut monitor = IntegrityMonitor::new();
        let start = Utc::now();

        // 12 events; the log must keep only the latest 10.
        let signals: Vec<_> = (0..12i64)
            .map(|i| (RawSignal::VisibilityHidden, start + TimeDelta::seconds(i)))
            .collect();
        feed(&mut monitor, &signals).await;

        assert_eq!(monitor.log().len(), EVENT_LOG_CAPACITY);
        // Front is the most recent insertion; the two oldest were evicted.
        assert_eq!(
            monitor.log().front().unwrap().timestamp,
            start + TimeDelta::seconds(11)
        );
        let oldest = monitor.log().iter().last().unwrap();
        assert_eq!(oldest.timestamp, start + TimeDelta::seconds(2));
        // The running count is not capped by the log.
        assert_eq!(monitor.flag_summary().count, 12);
    }

    #[tokio::test]
    async fn test_copy_then_tab_switch_scenario() {
        let mut monitor = IntegrityMonitor::new();
        let start = Utc::now();

        // One copy during question 2, one tab switch during question 4.
        feed(
            &mut monitor,
            &[
                (RawSignal::ClipboardCopy, start),
                (RawSignal::VisibilityHidden, start + TimeDelta::seconds(90)),
            ],
        )
        .await;

        let events: Vec<_> = monitor.log().iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, IntegrityKind::TabSwitch);
        assert_eq!(events[0].severity, Severity::High);
        assert_eq!(events[1].kind, IntegrityKind::CopyPaste);
        assert_eq!(events[1].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_pointer_signals_flip_gaze_without_events() {
        let mut monitor = IntegrityMonitor::new();

        let commands = feed(&mut monitor, &[(RawSignal::PointerLeave, Utc::now())]).await;
        assert_eq!(monitor.gaze(), GazeState::Distracted);
        assert!(commands.is_empty());
        assert!(monitor.log().is_empty());

        feed(&mut monitor, &[(RawSignal::PointerEnter, Utc::now())]).await;
        assert_eq!(monitor.gaze(), GazeState::Focused);
        assert!(monitor.log().is_empty());
    }

    #[tokio::test]
    async fn test_sustained_distraction_flags_once_per_tick() {
        let mut monitor = IntegrityMonitor::new();
        let start = Utc::now();

        // Pointer leaves at 0s and never returns; ticks arrive on the 5s
        // cadence. Within a 12s window only the 5s and 10s ticks emit.
        feed(
            &mut monitor,
            &[
                (RawSignal::PointerLeave, start),
                (RawSignal::GazeTick, start + TimeDelta::seconds(5)),
                (RawSignal::GazeTick, start + TimeDelta::seconds(10)),
            ],
        )
        .await;

        assert_eq!(monitor.log().len(), 2);
        assert!(
            monitor
                .log()
                .iter()
                .all(|e| e.kind == IntegrityKind::LookingAway)
        );
    }

    #[tokio::test]
    async fn test_tick_while_focused_emits_nothing() {
        let mut monitor = IntegrityMonitor::new();

        feed(&mut monitor, &[(RawSignal::GazeTick, Utc::now())]).await;
        assert!(monitor.log().is_empty());

        // Returning the pointer stops the flagging again.
        let start = Utc::now();
        feed(
            &mut monitor,
            &[
                (RawSignal::PointerLeave, start),
                (RawSignal::PointerEnter, start + TimeDelta::seconds(2)),
                (RawSignal::GazeTick, start + TimeDelta::seconds(5)),
            ],
        )
        .await;
        assert!(monitor.log().is_empty());
    }

    #[tokio::test]
    async fn test_capture_failure_records_one_high_focus_event() {
        let mut monitor = IntegrityMonitor::new();

        feed(&mut monitor, &[(RawSignal::CaptureFailed, Utc::now())]).await;

        assert_eq!(monitor.log().len(), 1);
        let event = monitor.log().front().unwrap();
        assert_eq!(event.kind, IntegrityKind::FocusLost);
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.description, DESC_CAPTURE_FAILED);
    }

    #[tokio::test]
    async fn test_every_event_raises_banner_warning_and_flag_write() {
        let mut monitor = IntegrityMonitor::new();
        let now = Utc::now();

        let commands = feed(&mut monitor, &[(RawSignal::FocusLost, now)]).await;

        assert_eq!(
            commands,
            vec![
                Command::ShowBanner(DESC_FOCUS_LOST.to_string()),
                Command::SpeakWarning(AUDIBLE_WARNING.to_string()),
                Command::PersistFlags(FlagSummary {
                    count: 1,
                    severity: Severity::Medium,
                }),
            ]
        );
        assert_eq!(monitor.banner().message(), Some(DESC_FOCUS_LOST));
    }

    #[tokio::test]
    async fn test_flag_summary_tracks_running_peak_severity() {
        let mut monitor = IntegrityMonitor::new();
        let start = Utc::now();

        feed(
            &mut monitor,
            &[
                (RawSignal::FocusLost, start),
                (RawSignal::VisibilityHidden, start + TimeDelta::seconds(1)),
                (RawSignal::ClipboardPaste, start + TimeDelta::seconds(2)),
            ],
        )
        .await;

        // High was observed in between; the summary never downgrades.
        assert_eq!(
            monitor.flag_summary(),
            FlagSummary {
                count: 3,
                severity: Severity::High,
            }
        );
    }

    #[tokio::test]
    async fn test_banner_expiry_is_last_write_wins() {
        let mut monitor = IntegrityMonitor::new();
        let start = Utc::now();

        // Event at T sets the deadline to T+4s.
        feed(&mut monitor, &[(RawSignal::FocusLost, start)]).await;
        assert_eq!(
            monitor.banner().deadline(),
            Some(start + TimeDelta::seconds(WARNING_BANNER_TTL_SECS))
        );

        // A second event at T+2s supersedes the pending clear.
        feed(
            &mut monitor,
            &[(RawSignal::ClipboardCopy, start + TimeDelta::seconds(2))],
        )
        .await;
        assert!(!monitor.expire_banner(start + TimeDelta::seconds(4)));
        assert_eq!(monitor.banner().message(), Some(DESC_CLIPBOARD));

        // With no further events the banner clears exactly at its deadline.
        assert!(monitor.expire_banner(start + TimeDelta::seconds(6)));
        assert_eq!(monitor.banner().message(), None);
        assert_eq!(monitor.banner().deadline(), None);
    }
}
