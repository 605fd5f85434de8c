pub const BRIDGE_URL_ENV: &str = "VIGIL_BRIDGE_URL";
pub const BRIDGE_TOKEN_ENV: &str = "VIGIL_BRIDGE_TOKEN";

pub const DEFAULT_BASE_URL: &str = "ws://127.0.0.1:9170/session";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
