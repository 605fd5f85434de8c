use super::config::Config;
use super::consts;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;

/// Builds the WebSocket handshake request for one session. The session id
/// is a path segment; the auth token, when configured, rides the standard
/// bearer header.
pub(crate) fn build_request(config: &Config) -> Result<Request> {
    let url = format!(
        "{}/{}",
        config.base_url().trim_end_matches('/'),
        config.session_id()
    );
    let mut request = url
        .as_str()
        .into_client_request()
        .with_context(|| format!("Invalid bridge url: {url}"))?;

    let token = config.auth_token().expose_secret();
    if !token.is_empty() {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("Bridge auth token is not a valid header value")?;
        request.headers_mut().insert(consts::AUTHORIZATION_HEADER, value);
    }
    Ok(request)
}
