use crate::integrity::FlagSummary;
use crate::transcript::TranscriptEntry;
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// The document-store contract for one session record.
///
/// Every write is an independent, idempotent-safe upsert; no transaction
/// spans two of them. Callers treat all three operations as best-effort:
/// failures are logged locally and never retried or surfaced, so an
/// implementation must not block session flow on its own error handling.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait PersistenceGateway: Send + Sync {
    /// Upserts the running integrity flag summary.
    async fn write_flag_summary(&self, session_id: &str, flags: &FlagSummary) -> Result<()>;

    /// Appends one entry to the session's append-only transcript array.
    async fn append_transcript_entry(
        &self,
        session_id: &str,
        entry: &TranscriptEntry,
    ) -> Result<()>;

    /// Writes the final status and analysis summary.
    async fn finalize_session(&self, session_id: &str, status: &str, summary: &str) -> Result<()>;
}
