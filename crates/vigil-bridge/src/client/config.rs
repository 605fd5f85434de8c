use super::consts;
use secrecy::SecretString;

/// Connection settings for the companion link. The relay address and auth
/// token come from the environment by default; the session id addresses one
/// interview and always comes from the caller.
pub struct Config {
    base_url: String,
    session_id: String,
    auth_token: SecretString,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.config.session_id = session_id.to_string();
        self
    }

    pub fn with_auth_token(mut self, auth_token: &str) -> Self {
        self.config.auth_token = SecretString::from(auth_token.to_string());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: std::env::var(consts::BRIDGE_URL_ENV)
                .unwrap_or_else(|_| consts::DEFAULT_BASE_URL.to_string()),
            session_id: String::new(),
            auth_token: std::env::var(consts::BRIDGE_TOKEN_ENV)
                .unwrap_or_default()
                .into(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn with_session_id(self, session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            ..self
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn auth_token(&self) -> &SecretString {
        &self.auth_token
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
