pub mod integrity;
pub mod persistence;
pub mod question;
pub mod session;
pub mod signal;
pub mod speech;
pub mod transcript;

use crate::integrity::FlagSummary;
use crate::transcript::TranscriptEntry;

/// Commands that the session logic issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (speaking, listening control,
/// banner updates, persistence writes). The core never performs I/O itself;
/// it sends one of these over a channel and moves on.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Synthesize the given question text to the candidate.
    Speak(String),
    /// Synthesize an integrity warning. Failure must be swallowed.
    SpeakWarning(String),
    /// Begin continuous answer recognition.
    ListenStart,
    /// Stop answer recognition.
    ListenStop,
    /// Show the transient warning banner with this message.
    ShowBanner(String),
    /// Clear the warning banner; sent only when the single expiry deadline
    /// passes without a newer event superseding it.
    ClearBanner,
    /// Best-effort write of the running integrity flag summary.
    PersistFlags(FlagSummary),
    /// Best-effort append of one completed question/answer pair.
    PersistTranscript(TranscriptEntry),
    /// Write the final session status and analysis summary. Emitted only on
    /// a completed interview, never on a forced termination.
    Finalize { status: String, summary: String },
    /// The session reached `Finished`; the runtime should hand control back
    /// and tear down.
    SessionComplete,
}
