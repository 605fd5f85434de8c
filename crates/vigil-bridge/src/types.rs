use serde::{Deserialize, Serialize};

/// Events the service sends to the companion.
///
/// The companion owns the platform capabilities (speech synthesis and
/// recognition, media capture, the banner overlay); these events drive
/// them. Serialized as tagged JSON, e.g. `{"type":"listen_start"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Speak `text` with the given platform voice, if any.
    SpeakRequest {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
    },
    /// Begin continuous recognition. Idempotent on the companion side.
    ListenStart,
    /// Stop recognition. Safe when recognition never started.
    ListenStop,
    /// Acquire the media capture stream.
    CaptureStart { video: bool, audio: bool },
    /// Release the media capture stream.
    CaptureStop,
    /// Show (`Some`) or clear (`None`) the warning banner.
    BannerUpdate { message: Option<String> },
    /// The interview is over; the companion navigates back to its results
    /// view and must make no further session calls.
    SessionComplete,
}

/// Raw proctoring signals the companion forwards from its platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    VisibilityHidden,
    FocusLost,
    ClipboardCopy,
    ClipboardPaste,
    PointerEnter,
    PointerLeave,
}

/// Events the companion sends to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First event after the link opens; advertises the platform's
    /// synthesis voices (possibly none).
    SessionCreated { voices: Vec<String> },
    /// One increment from the recognition stream. Interim results carry
    /// `is_final: false` and are expected to be discarded.
    RecognitionResult { is_final: bool, text: String },
    /// A raw proctoring signal occurrence.
    Signal { kind: SignalKind },
    /// Media capture was acquired.
    CaptureReady,
    /// Media capture could not be acquired.
    CaptureDenied { reason: Option<String> },
    /// The candidate asked for the next question.
    AdvanceRequested,
    /// A companion-side error; informational only.
    Error { message: String },
    /// Synthesized locally when the link closes; never on the wire.
    #[serde(skip)]
    Close { reason: Option<String> },
}
