use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How often the gaze proxy is sampled while the session runs.
pub const GAZE_TICK_SECS: u64 = 5;

/// One raw proctoring signal occurrence, before classification.
///
/// Pointer signals and the tick never carry payloads; the monitor derives
/// everything from which signal fired and its own gaze state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSignal {
    /// The interview page became hidden (tab switch or minimize).
    VisibilityHidden,
    /// The window lost input focus.
    FocusLost,
    ClipboardCopy,
    ClipboardPaste,
    PointerEnter,
    PointerLeave,
    /// Periodic sample of the gaze proxy.
    GazeTick,
    /// The camera/microphone capture could not be acquired.
    CaptureFailed,
}

/// A capability that produces raw signals.
///
/// Sources are injected into the runtime rather than subscribed ambiently,
/// so tests can synthesize arbitrary signal sequences deterministically.
/// Dropping the returned `Subscription` unsubscribes.
pub trait SignalSource {
    fn subscribe(&mut self, tx: mpsc::Sender<RawSignal>) -> Subscription;
}

/// Keeps a signal delivery task alive; aborts it on drop.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn from_task(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Emits `GazeTick` on a fixed cadence for as long as the subscription and
/// the receiving side are alive.
#[derive(Debug)]
pub struct GazeTicker {
    period: Duration,
}

impl GazeTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for GazeTicker {
    fn default() -> Self {
        Self::new(Duration::from_secs(GAZE_TICK_SECS))
    }
}

impl SignalSource for GazeTicker {
    fn subscribe(&mut self, tx: mpsc::Sender<RawSignal>) -> Subscription {
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; the cadence starts one
            // full period after subscription.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(RawSignal::GazeTick).await.is_err() {
                    break;
                }
            }
        });
        Subscription::from_task(handle)
    }
}
