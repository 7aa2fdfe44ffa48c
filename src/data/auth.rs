//! OAuth PKCE login for the publisher API
//!
//! Generates PKCE material, builds the authorize URL, exchanges the
//! authorization code for a token and persists the token as JSON in the
//! XDG config directory so a login survives restarts. When a client secret
//! is configured the exchange is attempted with it first, falling back to
//! a public-client exchange if the upstream CDN blocks the request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use rand::RngCore;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::config::{Config, DEFAULT_USER_AGENT, OAUTH_SCOPES};

/// Base URL of the OAuth provider
const OAUTH_BASE_URL: &str = "https://www.pathofexile.com";

/// File name of the persisted token inside the config directory
const TOKEN_FILE: &str = "token.json";

/// Byte length of the PKCE code verifier before encoding
const VERIFIER_BYTES: usize = 32;

/// Byte length of the state parameter before encoding
const STATE_BYTES: usize = 12;

/// Errors that can occur during login
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Token endpoint answered with a non-success status
    #[error("token endpoint returned status {status}")]
    UpstreamUnavailable { status: StatusCode },

    /// Token payload did not parse
    #[error("malformed token payload: {0}")]
    UpstreamMalformed(#[from] serde_json::Error),

    /// The CDN in front of the provider blocked the exchange
    #[error("token exchange blocked by the upstream CDN")]
    Blocked,

    /// The returned state did not match the one we issued
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// Authorize URL construction failed
    #[error("invalid authorize URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// PKCE material for one login round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkceMaterial {
    /// Code verifier, base64url without padding
    pub verifier: String,
    /// S256 code challenge derived from the verifier
    pub challenge: String,
    /// Opaque state echoed back by the provider
    pub state: String,
}

impl PkceMaterial {
    /// Generates fresh verifier, challenge and state.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; VERIFIER_BYTES];
        rand::thread_rng().fill_bytes(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; STATE_BYTES];
        rand::thread_rng().fill_bytes(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        let challenge = Self::challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the S256 challenge for a verifier.
    pub fn challenge_for(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

/// An OAuth token plus the time it was obtained
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds, as issued
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    /// When the token was obtained; expiry is derived from this
    pub obtained_at: DateTime<Utc>,
}

impl AuthToken {
    /// The instant this token stops being valid.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.obtained_at + Duration::seconds(self.expires_in as i64)
    }

    /// True once the token lifetime has elapsed as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Persists the token as JSON in the config directory
#[derive(Debug, Clone)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    /// Creates a store under the XDG config directory. Returns `None` when
    /// no home directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "poemarket")?;
        Some(Self {
            dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    /// Creates a store rooted at a custom directory (for testing).
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    /// Loads the persisted token, if any. A missing or unreadable file is
    /// simply "not logged in".
    pub fn load(&self) -> Option<AuthToken> {
        let content = fs::read_to_string(self.token_path()).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Writes the token, creating the directory as needed.
    pub fn save(&self, token: &AuthToken) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(self.token_path(), json)
    }

    /// Deletes the persisted token. Used on logout; a missing file is fine.
    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(self.token_path()) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Client for the OAuth endpoints
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    config: Config,
}

impl AuthClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            base_url: OAUTH_BASE_URL.to_string(),
            config,
        }
    }

    /// Builds the authorize URL the user opens in a browser.
    pub fn authorize_url(&self, pkce: &PkceMaterial) -> Result<String, AuthError> {
        let mut url = Url::parse(&format!("{}/oauth/authorize", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", &OAUTH_SCOPES.join(" "))
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", &pkce.state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("prompt", "consent");
        Ok(url.to_string())
    }

    /// Exchanges an authorization code for a token.
    ///
    /// The state from the callback must match the one issued with `pkce`.
    /// With a configured secret, a blocked confidential exchange is retried
    /// once as a public client; any other failure surfaces immediately.
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        pkce: &PkceMaterial,
    ) -> Result<AuthToken, AuthError> {
        if state != pkce.state {
            return Err(AuthError::StateMismatch);
        }

        let attempts: &[bool] = if self.config.client_secret.is_some() {
            &[true, false]
        } else {
            &[false]
        };

        let url = format!("{}/oauth/token", self.base_url);
        for include_secret in attempts {
            let mut form: Vec<(&str, String)> = vec![
                ("grant_type", "authorization_code".to_string()),
                ("client_id", self.config.client_id.clone()),
                ("code", code.to_string()),
                ("redirect_uri", self.config.redirect_uri.clone()),
                ("code_verifier", pkce.verifier.clone()),
                ("scope", OAUTH_SCOPES.join(" ")),
            ];
            if *include_secret {
                if let Some(secret) = &self.config.client_secret {
                    form.push(("client_secret", secret.clone()));
                }
            }

            let response = self
                .client
                .post(&url)
                .header(reqwest::header::USER_AGENT, DEFAULT_USER_AGENT)
                .header(reqwest::header::ACCEPT, "application/json")
                .form(&form)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;

            if is_cdn_block(&text) {
                // Try the next attempt shape, if any remains.
                continue;
            }
            if !status.is_success() {
                return Err(AuthError::UpstreamUnavailable { status });
            }

            let raw: RawToken = serde_json::from_str(&text)?;
            return Ok(raw.into_token(Utc::now()));
        }

        Err(AuthError::Blocked)
    }
}

/// Detects a CDN interstitial standing in for the token endpoint.
fn is_cdn_block(body: &str) -> bool {
    body.contains("<title>Attention Required! | Cloudflare</title>")
        || body.contains("cf-error-details")
        || body.contains("You are unable to access")
}

/// Token wire format
#[derive(Debug, Deserialize)]
struct RawToken {
    access_token: String,
    token_type: String,
    expires_in: u64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl RawToken {
    fn into_token(self, obtained_at: DateTime<Utc>) -> AuthToken {
        AuthToken {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_in: self.expires_in,
            refresh_token: self.refresh_token,
            scope: self.scope,
            obtained_at,
        }
    }
}
