use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use vigil_core::integrity::FlagSummary;
use vigil_core::persistence::PersistenceGateway;
use vigil_core::transcript::TranscriptEntry;

/// Document-store client for session records.
///
/// Each session is one document under `/sessions/{id}`. Flag summaries and
/// the final status are merge-upserts against the document; transcript
/// entries append to its array field. Every write stands alone, so a lost
/// one never corrupts the record, it only leaves it stale. The callers
/// treat all of this as best-effort.
pub struct DocStore {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl DocStore {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/sessions/{}",
            self.base_url.trim_end_matches('/'),
            session_id
        )
    }

    async fn merge(&self, url: &str, body: &Value) -> Result<()> {
        self.client
            .patch(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .with_context(|| format!("Store request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("Store rejected write to {url}"))?;
        Ok(())
    }

    fn flags_body(flags: &FlagSummary) -> Value {
        json!({ "flags": flags })
    }

    fn finalize_body(status: &str, summary: &str) -> Value {
        json!({
            "status": status,
            "aiAnalysis": { "summary": summary },
        })
    }
}

#[async_trait]
impl PersistenceGateway for DocStore {
    async fn write_flag_summary(&self, session_id: &str, flags: &FlagSummary) -> Result<()> {
        let url = self.session_url(session_id);
        self.merge(&url, &Self::flags_body(flags)).await
    }

    async fn append_transcript_entry(
        &self,
        session_id: &str,
        entry: &TranscriptEntry,
    ) -> Result<()> {
        // Appends are a POST to the array resource so that replays cannot
        // overwrite earlier entries.
        let url = format!("{}/transcript", self.session_url(session_id));
        self.client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(entry)
            .send()
            .await
            .with_context(|| format!("Store request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("Store rejected write to {url}"))?;
        Ok(())
    }

    async fn finalize_session(&self, session_id: &str, status: &str, summary: &str) -> Result<()> {
        let url = self.session_url(session_id);
        self.merge(&url, &Self::finalize_body(status, summary)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::integrity::Severity;

    fn store() -> DocStore {
        DocStore::new(
            "https://store.example.dev/v1/",
            SecretString::from("test-key".to_string()),
        )
    }

    #[test]
    fn test_session_url_joins_without_double_slash() {
        assert_eq!(
            store().session_url("abc123"),
            "https://store.example.dev/v1/sessions/abc123"
        );
    }

    #[test]
    fn test_flags_body_shape() {
        let body = DocStore::flags_body(&FlagSummary {
            count: 7,
            severity: Severity::High,
        });
        assert_eq!(
            body,
            serde_json::json!({ "flags": { "count": 7, "severity": "High" } })
        );
    }

    #[test]
    fn test_finalize_body_shape() {
        let body = DocStore::finalize_body("Completed", "All questions answered.");
        assert_eq!(
            body,
            serde_json::json!({
                "status": "Completed",
                "aiAnalysis": { "summary": "All questions answered." },
            })
        );
    }

    #[test]
    fn test_transcript_entry_serializes_iso_timestamp() {
        let timestamp = chrono::DateTime::parse_from_rfc3339("2026-08-06T10:30:00Z")
            .unwrap()
            .to_utc();
        let entry = TranscriptEntry::new("q".to_string(), "a".to_string(), timestamp);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], "2026-08-06T10:30:00Z");
        assert_eq!(json["sentiment"], "Neutral");
    }
}
