use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment analysis is performed offline by the reporting side; entries
/// are stamped with this placeholder until that pipeline fills it in.
pub const SENTIMENT_PLACEHOLDER: &str = "Neutral";

/// One completed question/answer pair. Immutable once created; the
/// timestamp serializes as an RFC 3339 instant for the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
    pub sentiment: String,
}

impl TranscriptEntry {
    pub fn new(question: String, answer: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            question,
            answer,
            timestamp,
            sentiment: SENTIMENT_PLACEHOLDER.to_string(),
        }
    }
}

/// Collects the session's transcript, one entry per answered question.
/// The session state machine calls `record` exactly once per advance; the
/// runtime forwards the returned entry to the persistence gateway.
#[derive(Debug, Default)]
pub struct TranscriptRecorder {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packages and appends one entry. An empty answer is still recorded;
    /// the candidate may simply never have spoken.
    pub fn record(
        &mut self,
        question: String,
        answer: String,
        timestamp: DateTime<Utc>,
    ) -> &TranscriptEntry {
        self.entries.push(TranscriptEntry::new(question, answer, timestamp));
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
