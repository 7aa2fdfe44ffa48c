//! Runtime configuration from environment variables
//!
//! OAuth credentials and trade-client knobs are supplied via the
//! environment (a `.env` file is honored in development). Nothing here is
//! required for the price views; missing OAuth values only disable the
//! account features.

use std::env;

/// Default OAuth client id registered for this application
const DEFAULT_CLIENT_ID: &str = "poemarket";

/// Default redirect URI registered with the OAuth provider
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8327/oauth/callback";

/// Scopes requested at authorization time
pub const OAUTH_SCOPES: &[&str] = &["account:profile", "account:characters"];

/// User-Agent sent on every upstream request unless overridden
pub const DEFAULT_USER_AGENT: &str = "poemarket/0.1 (terminal-dashboard)";

/// Application configuration assembled at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret, when the registration is confidential
    pub client_secret: Option<String>,
    /// OAuth redirect URI
    pub redirect_uri: String,
    /// User-Agent override for trade requests
    pub trade_user_agent: Option<String>,
    /// Kill switch: when false, trade search calls are refused locally
    pub trade_enabled: bool,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// Recognized variables: `POE_CLIENT_ID`, `POE_CLIENT_SECRET`,
    /// `POE_REDIRECT_URI`, `POE_TRADE_USER_AGENT`, `POE_TRADE_ENABLED`.
    pub fn from_env() -> Self {
        Self {
            client_id: env::var("POE_CLIENT_ID").unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string()),
            client_secret: env::var("POE_CLIENT_SECRET").ok().filter(|s| !s.is_empty()),
            redirect_uri: env::var("POE_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
            trade_user_agent: env::var("POE_TRADE_USER_AGENT").ok().filter(|s| !s.is_empty()),
            trade_enabled: env::var("POE_TRADE_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            trade_user_agent: None,
            trade_enabled: true,
        }
    }
}
