use crate::types::{ClientEvent, ServerEvent};
use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

pub(crate) mod config;
mod consts;
mod utils;

use crate::client::config::Config;

pub type ClientTx = tokio::sync::mpsc::Sender<ClientEvent>;
type ServerTx = tokio::sync::broadcast::Sender<ServerEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<ServerEvent>;

/// WebSocket link to the candidate-side companion.
///
/// Outbound events go through an mpsc channel into a write task; inbound
/// events are parsed in a read task and fanned out over a broadcast
/// channel, so the handshake and the event pump can each hold their own
/// receiver.
pub struct Client {
    capacity: usize,
    config: Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
}

impl Client {
    fn new(capacity: usize, config: Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow::anyhow!("already connected"));
        }

        let request = utils::build_request(&self.config)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx.clone());
        self.s_tx = Some(s_tx.clone());

        // Write task: serialize outbound events onto the socket.
        tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send event to companion: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
        });

        // Read task: parse inbound messages and broadcast them. A socket
        // close is surfaced as a synthesized Close event so subscribers see
        // the link go away.
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read from companion: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            tracing::debug!(?event, "companion event");
                            if let Err(e) = s_tx.send(event) {
                                tracing::error!("failed to broadcast event: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::error!("failed to deserialize event: {}, text=> {:?}", e, text);
                        }
                    },
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("companion link closed: {:?}", reason);
                        let close_event = ServerEvent::Close {
                            reason: reason.map(|v| format!("{:?}", v)),
                        };
                        if let Err(e) = s_tx.send(close_event) {
                            tracing::error!("failed to broadcast close event: {}", e);
                        }
                        break;
                    }
                    _ => {}
                }
            }
            drop(c_tx);
            drop(s_tx);
        });
        Ok(())
    }

    /// A new subscription to companion events. Each receiver sees every
    /// event sent after it subscribes.
    pub fn server_events(&self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    /// A clone of the outbound sender, for adapters that send raw events.
    pub fn outbound(&self) -> Result<ClientTx> {
        match self.c_tx {
            Some(ref tx) => Ok(tx.clone()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    async fn send_client_event(&mut self, event: ClientEvent) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(event).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    pub async fn speak_request(&mut self, text: &str, voice: Option<String>) -> Result<()> {
        self.send_client_event(ClientEvent::SpeakRequest {
            text: text.to_string(),
            voice,
        })
        .await
    }

    pub async fn listen_start(&mut self) -> Result<()> {
        self.send_client_event(ClientEvent::ListenStart).await
    }

    pub async fn listen_stop(&mut self) -> Result<()> {
        self.send_client_event(ClientEvent::ListenStop).await
    }

    pub async fn capture_start(&mut self, video: bool, audio: bool) -> Result<()> {
        self.send_client_event(ClientEvent::CaptureStart { video, audio })
            .await
    }

    pub async fn capture_stop(&mut self) -> Result<()> {
        self.send_client_event(ClientEvent::CaptureStop).await
    }

    pub async fn banner_update(&mut self, message: Option<String>) -> Result<()> {
        self.send_client_event(ClientEvent::BannerUpdate { message })
            .await
    }

    pub async fn session_complete(&mut self) -> Result<()> {
        self.send_client_event(ClientEvent::SessionComplete).await
    }
}

/// Connects to the companion relay with an explicit configuration.
pub async fn connect_with_config(capacity: usize, config: Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

/// Connects with configuration taken from the environment.
pub async fn connect(session_id: &str) -> Result<Client> {
    let config = Config::new().with_session_id(session_id);
    connect_with_config(256, config).await
}
