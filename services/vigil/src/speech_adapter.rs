use anyhow::{Context, Result};
use async_trait::async_trait;
use vigil_bridge::ClientTx;
use vigil_bridge::types::ClientEvent;
use vigil_core::speech::SpeechIo;

/// Adapts the companion link to the core speech port.
///
/// Synthesis and recognition control become wire events on the bridge's
/// outbound channel; the voice inventory is whatever the companion
/// announced at session creation. No audio ever flows back through here.
pub struct BridgeSpeech {
    outbound: ClientTx,
    voices: Vec<String>,
}

impl BridgeSpeech {
    pub fn new(outbound: ClientTx, voices: Vec<String>) -> Self {
        Self { outbound, voices }
    }
}

#[async_trait]
impl SpeechIo for BridgeSpeech {
    async fn synthesize(&mut self, text: &str, voice: Option<String>) -> Result<()> {
        self.outbound
            .send(ClientEvent::SpeakRequest {
                text: text.to_string(),
                voice,
            })
            .await
            .context("Companion link is gone; cannot synthesize")
    }

    async fn start_listening(&mut self) -> Result<()> {
        self.outbound
            .send(ClientEvent::ListenStart)
            .await
            .context("Companion link is gone; cannot start recognition")
    }

    async fn stop_listening(&mut self) -> Result<()> {
        self.outbound
            .send(ClientEvent::ListenStop)
            .await
            .context("Companion link is gone; cannot stop recognition")
    }

    fn voices(&self) -> Vec<String> {
        self.voices.clone()
    }
}
