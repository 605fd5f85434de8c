use crate::Command;
use crate::question::QuestionSet;
use crate::transcript::{TranscriptEntry, TranscriptRecorder};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Status written for a completed interview.
pub const STATUS_COMPLETED: &str = "Completed";

/// Placeholder analysis summary written at completion; the real analysis is
/// produced by the reporting side from the persisted flags and transcript.
pub const COMPLETION_SUMMARY: &str =
    "Interview completed via AI Monitor. Check logs for behavioral analysis.";

/// The stage of the question-delivery/answer-capture protocol. Exactly one
/// phase is active; transitions are strictly
/// `Idle -> Speaking -> Listening -> Advancing -> {Speaking | Finished}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Speaking,
    Listening,
    Advancing,
    Finished,
}

/// State-machine misuse. Unlike environmental failures this is fatal: it
/// means a caller broke the protocol contract, not that a capability
/// degraded.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("advance() is not valid in the {0:?} phase; no answer capture is active")]
    AdvanceBeforeListening(SessionPhase),
}

/// Drives one candidate through the fixed question sequence.
///
/// All mutable session state lives here, scoped to this value; nothing is
/// ambient, so concurrent sessions (or tests) never interfere. Side effects
/// are expressed as `Command`s sent to the runtime. The machine never blocks
/// on synthesis, recognition, or persistence.
pub struct InterviewSession {
    questions: QuestionSet,
    current_index: usize,
    phase: SessionPhase,
    answer_buffer: String,
    /// Guards against re-synthesizing the current question if the
    /// `Speaking` phase is re-entered.
    spoken_guard: bool,
    recorder: TranscriptRecorder,
}

impl InterviewSession {
    /// The question set must be non-empty; the loader enforces that.
    pub fn new(questions: QuestionSet) -> Self {
        Self {
            questions,
            current_index: 0,
            phase: SessionPhase::Idle,
            answer_buffer: String::new(),
            spoken_guard: false,
            recorder: TranscriptRecorder::new(),
        }
    }

    /// Begins question zero. Calling `start` on a session that already
    /// started is a no-op, leaving the state exactly as one call would.
    pub async fn start(&mut self, command_tx: &mpsc::Sender<Command>) -> Result<()> {
        if self.phase != SessionPhase::Idle {
            tracing::debug!(phase = ?self.phase, "start() ignored, session already started");
            return Ok(());
        }
        self.enter_speaking(command_tx).await
    }

    /// Delivers the current question and opens answer capture.
    ///
    /// Recognition starts concurrently with synthesis rather than after
    /// playback completes, so the first words of an eager answer may overlap
    /// the question being read aloud. Intentional; see the product notes
    /// before changing.
    async fn enter_speaking(&mut self, command_tx: &mpsc::Sender<Command>) -> Result<()> {
        self.phase = SessionPhase::Speaking;
        if !self.spoken_guard {
            let text = self
                .questions
                .get(self.current_index)
                .map(|q| q.text.clone())
                .context("current question index out of bounds")?;
            tracing::info!(
                question = self.current_index + 1,
                of = self.questions.len(),
                "delivering question"
            );
            command_tx
                .send(Command::Speak(text))
                .await
                .context("Failed to send Speak command")?;
            self.spoken_guard = true;
        }
        command_tx
            .send(Command::ListenStart)
            .await
            .context("Failed to send ListenStart command")?;
        self.phase = SessionPhase::Listening;
        Ok(())
    }

    /// Appends one finalized recognition segment to the current answer.
    /// Segments arriving outside answer capture are dropped.
    pub fn push_answer_segment(&mut self, text: &str) {
        match self.phase {
            SessionPhase::Speaking | SessionPhase::Listening => {
                if !self.answer_buffer.is_empty() {
                    self.answer_buffer.push(' ');
                }
                self.answer_buffer.push_str(text);
            }
            _ => {
                tracing::debug!(phase = ?self.phase, "dropping answer segment outside capture");
            }
        }
    }

    /// Completes the current question: records the transcript entry, resets
    /// the answer buffer and spoken guard, then moves to the next question
    /// or finishes the interview.
    ///
    /// Valid only once answer capture has begun. Calling it in `Idle` or
    /// `Speaking` is a contract violation and returns the fatal
    /// `SessionError`; duplicate requests after `Advancing`/`Finished` are
    /// dropped.
    pub async fn advance(
        &mut self,
        now: DateTime<Utc>,
        command_tx: &mpsc::Sender<Command>,
    ) -> Result<()> {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Speaking => {
                return Err(SessionError::AdvanceBeforeListening(self.phase).into());
            }
            SessionPhase::Advancing | SessionPhase::Finished => {
                tracing::debug!(phase = ?self.phase, "duplicate advance request dropped");
                return Ok(());
            }
            SessionPhase::Listening => {}
        }
        self.phase = SessionPhase::Advancing;

        let question_text = self
            .questions
            .get(self.current_index)
            .map(|q| q.text.clone())
            .context("current question index out of bounds")?;
        let answer = std::mem::take(&mut self.answer_buffer);
        let entry = self.recorder.record(question_text, answer, now).clone();
        command_tx
            .send(Command::PersistTranscript(entry))
            .await
            .context("Failed to send PersistTranscript command")?;
        self.spoken_guard = false;

        if self.questions.is_last(self.current_index) {
            self.complete(command_tx).await
        } else {
            self.current_index += 1;
            self.enter_speaking(command_tx).await
        }
    }

    /// Normal completion: the last question was advanced past. Writes the
    /// final status before handing control back.
    async fn complete(&mut self, command_tx: &mpsc::Sender<Command>) -> Result<()> {
        self.phase = SessionPhase::Finished;
        tracing::info!(answered = self.recorder.len(), "interview complete");
        command_tx
            .send(Command::ListenStop)
            .await
            .context("Failed to send ListenStop command")?;
        command_tx
            .send(Command::Finalize {
                status: STATUS_COMPLETED.to_string(),
                summary: COMPLETION_SUMMARY.to_string(),
            })
            .await
            .context("Failed to send Finalize command")?;
        command_tx
            .send(Command::SessionComplete)
            .await
            .context("Failed to send SessionComplete command")?;
        Ok(())
    }

    /// Forces the session to `Finished` from any phase, stopping speech I/O.
    /// Used on errors and external termination; unlike a completed
    /// interview, no final status is written.
    pub async fn finish(&mut self, command_tx: &mpsc::Sender<Command>) -> Result<()> {
        if self.phase == SessionPhase::Finished {
            return Ok(());
        }
        self.phase = SessionPhase::Finished;
        tracing::info!(answered = self.recorder.len(), "session terminated");
        command_tx
            .send(Command::ListenStop)
            .await
            .context("Failed to send ListenStop command")?;
        command_tx
            .send(Command::SessionComplete)
            .await
            .context("Failed to send SessionComplete command")?;
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn answer_buffer(&self) -> &str {
        &self.answer_buffer
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        self.recorder.entries()
    }
}
