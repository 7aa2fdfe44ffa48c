//! Account client for the publisher OAuth API
//!
//! Fetches the authenticated profile, the character list and a character's
//! items, trying the known endpoint variants in order. Responses are cached
//! briefly per token so switching between views does not hammer the
//! upstream. Account-scoped data is never served stale: on upstream
//! failure the error surfaces.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use super::fallback::{resolve_candidates, Exhausted};
use super::{Character, CharacterItem, ItemProperty, ItemSocket, SocketedGem};
use crate::cache::SharedCache;
use crate::config::DEFAULT_USER_AGENT;

/// Base URL of the publisher API host
const API_BASE_URL: &str = "https://api.pathofexile.com";

/// Base URL of the publisher web host, which mirrors some endpoints
const WWW_BASE_URL: &str = "https://www.pathofexile.com";

/// Character list cache time-to-live in seconds (per token)
pub const CHARACTERS_CACHE_TTL_SECS: i64 = 60;

/// Character items cache time-to-live in seconds (per token and character)
pub const ITEMS_CACHE_TTL_SECS: i64 = 30;

/// Errors that can occur when fetching account data
#[derive(Debug, Error)]
pub enum AccountError {
    /// A required request parameter was missing or empty
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}")]
    UpstreamUnavailable { status: StatusCode },

    /// Upstream payload did not parse or had an unexpected shape
    #[error("malformed upstream payload: {0}")]
    UpstreamMalformed(#[from] serde_json::Error),

    /// Every endpoint variant failed
    #[error("all {attempts} endpoint variants failed")]
    EndpointsExhausted {
        attempts: usize,
        #[source]
        last: Box<AccountError>,
    },
}

impl From<Exhausted<AccountError>> for AccountError {
    fn from(e: Exhausted<AccountError>) -> Self {
        AccountError::EndpointsExhausted {
            attempts: e.attempts,
            last: Box::new(e.last),
        }
    }
}

/// Client for the account endpoints of the publisher API
#[derive(Debug, Clone)]
pub struct AccountClient {
    client: Client,
    api_base: String,
    www_base: String,
    characters_cache: SharedCache<Vec<Character>>,
    items_cache: SharedCache<Vec<CharacterItem>>,
}

impl AccountClient {
    /// Creates a client around caches owned by the composition root.
    pub fn new(
        characters_cache: SharedCache<Vec<Character>>,
        items_cache: SharedCache<Vec<CharacterItem>>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base: API_BASE_URL.to_string(),
            www_base: WWW_BASE_URL.to_string(),
            characters_cache,
            items_cache,
        }
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, DEFAULT_USER_AGENT)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
    }

    /// Returns the account name for the token, or `None` when the profile
    /// endpoint fails for any reason. Profile resolution is best-effort:
    /// the character endpoints also work unqualified.
    pub async fn profile_name(&self, token: &str) -> Option<String> {
        let url = format!("{}/profile", self.api_base);
        let response = self.authed(self.client.get(&url), token).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let profile: RawProfile = response.json().await.ok()?;
        profile.name
    }

    /// Fetches the character list for the authenticated account.
    pub async fn characters(&self, token: &str) -> Result<Vec<Character>, AccountError> {
        if token.is_empty() {
            return Err(AccountError::InvalidRequest("token"));
        }
        if let Some(hit) = self.characters_cache.get(token) {
            return Ok(hit);
        }

        let account = self.profile_name(token).await;
        let query = account
            .as_deref()
            .map(|name| format!("?accountName={}", urlencode(name)))
            .unwrap_or_default();

        let candidates = [
            format!("{}/character-window/get-characters{query}", self.api_base),
            format!("{}/character-window/get-characters{query}", self.www_base),
            format!("{}/profile/characters{query}", self.api_base),
        ];

        let characters = resolve_candidates(
            candidates,
            |url| self.fetch_characters_from(url, token),
            || AccountError::InvalidRequest("no endpoint candidates"),
        )
        .await
        .map_err(AccountError::from)?;

        self.characters_cache.put(token, characters.clone());
        Ok(characters)
    }

    async fn fetch_characters_from(
        &self,
        url: String,
        token: &str,
    ) -> Result<Vec<Character>, AccountError> {
        let response = self.authed(self.client.get(&url), token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AccountError::UpstreamUnavailable { status });
        }

        let text = response.text().await?;
        let raw: RawCharactersResponse = serde_json::from_str(&text)?;
        let characters = match raw {
            RawCharactersResponse::Bare(list) => list,
            RawCharactersResponse::Wrapped { characters } => characters,
        };
        Ok(characters.into_iter().map(Character::from).collect())
    }

    /// Fetches a character's items (equipment plus inventory).
    ///
    /// The account name is resolved via the profile when not supplied.
    pub async fn character_items(
        &self,
        token: &str,
        character: &str,
        account_name: Option<&str>,
    ) -> Result<Vec<CharacterItem>, AccountError> {
        if token.is_empty() {
            return Err(AccountError::InvalidRequest("token"));
        }
        if character.is_empty() {
            return Err(AccountError::InvalidRequest("character"));
        }

        let key = format!("{token}::{character}");
        if let Some(hit) = self.items_cache.get(&key) {
            return Ok(hit);
        }

        let account = match account_name {
            Some(name) => Some(name.to_string()),
            None => self.profile_name(token).await,
        };
        let mut query = format!("?character={}", urlencode(character));
        if let Some(name) = account.as_deref() {
            query.push_str(&format!("&accountName={}", urlencode(name)));
        }

        let candidates = [
            format!("{}/character-window/get-items{query}", self.api_base),
            format!("{}/character-window/get-items{query}", self.www_base),
        ];

        let items = resolve_candidates(
            candidates,
            |url| self.fetch_items_from(url, token),
            || AccountError::InvalidRequest("no endpoint candidates"),
        )
        .await
        .map_err(AccountError::from)?;

        self.items_cache.put(&key, items.clone());
        Ok(items)
    }

    async fn fetch_items_from(
        &self,
        url: String,
        token: &str,
    ) -> Result<Vec<CharacterItem>, AccountError> {
        let response = self.authed(self.client.get(&url), token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AccountError::UpstreamUnavailable { status });
        }

        let text = response.text().await?;
        let raw: RawItemsResponse = serde_json::from_str(&text)?;
        Ok(raw.items.into_iter().map(CharacterItem::from).collect())
    }
}

/// Percent-encodes the characters that occur in account and character names
fn urlencode(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace('#', "%23")
        .replace('&', "%26")
        .replace('+', "%2B")
}

/// Profile wire format
#[derive(Debug, Deserialize)]
struct RawProfile {
    name: Option<String>,
}

/// The character list arrives either bare or wrapped
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCharactersResponse {
    Bare(Vec<RawCharacter>),
    Wrapped { characters: Vec<RawCharacter> },
}

#[derive(Debug, Deserialize)]
struct RawCharacter {
    name: String,
    #[serde(default)]
    level: u32,
    class: Option<String>,
    #[serde(rename = "baseClass")]
    base_class: Option<String>,
    #[serde(rename = "classId")]
    class_id: Option<u32>,
    league: Option<String>,
    #[serde(rename = "ascendancyClass")]
    ascendancy_class: Option<u32>,
    #[serde(rename = "lastActive")]
    last_active: Option<bool>,
}

impl From<RawCharacter> for Character {
    fn from(raw: RawCharacter) -> Self {
        Character {
            name: raw.name,
            level: raw.level,
            class: raw
                .class
                .or(raw.base_class)
                .unwrap_or_else(|| "Unknown".to_string()),
            class_id: raw.class_id,
            league: raw.league,
            ascendancy_class: raw.ascendancy_class,
            last_active: raw.last_active,
        }
    }
}

/// Items wire format
#[derive(Debug, Deserialize)]
struct RawItemsResponse {
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "typeLine", default)]
    type_line: String,
    icon: Option<String>,
    #[serde(rename = "inventoryId", default)]
    inventory_id: String,
    #[serde(rename = "frameType", default)]
    frame_type: u32,
    #[serde(default)]
    w: u32,
    #[serde(default)]
    h: u32,
    ilvl: Option<u32>,
    #[serde(default)]
    corrupted: bool,
    note: Option<String>,
    #[serde(default)]
    sockets: Vec<RawSocket>,
    #[serde(rename = "socketedItems", default)]
    socketed_items: Vec<RawSocketedItem>,
    #[serde(default)]
    properties: Vec<RawProperty>,
    #[serde(rename = "implicitMods", default)]
    implicit_mods: Vec<String>,
    #[serde(rename = "explicitMods", default)]
    explicit_mods: Vec<String>,
    #[serde(rename = "craftedMods", default)]
    crafted_mods: Vec<String>,
    #[serde(rename = "enchantMods", default)]
    enchant_mods: Vec<String>,
    #[serde(rename = "fracturedMods", default)]
    fractured_mods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSocket {
    #[serde(default)]
    group: u32,
    colour: Option<String>,
    #[serde(rename = "sColour")]
    s_colour: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSocketedItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "typeLine", default)]
    type_line: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    name: String,
    #[serde(default)]
    values: Vec<serde_json::Value>,
}

impl From<RawItem> for CharacterItem {
    fn from(raw: RawItem) -> Self {
        CharacterItem {
            id: raw.id,
            name: raw.name,
            type_line: raw.type_line,
            icon: raw.icon,
            inventory_id: raw.inventory_id,
            frame_type: raw.frame_type,
            w: raw.w,
            h: raw.h,
            ilvl: raw.ilvl,
            corrupted: raw.corrupted,
            note: raw.note,
            sockets: raw
                .sockets
                .into_iter()
                .map(|s| ItemSocket {
                    group: s.group,
                    colour: s
                        .colour
                        .or(s.s_colour)
                        .unwrap_or_default()
                        .to_lowercase(),
                })
                .collect(),
            socketed_items: raw
                .socketed_items
                .into_iter()
                .map(|g| SocketedGem {
                    support: g.type_line.contains("Support"),
                    id: g.id,
                    name: g.name,
                    type_line: g.type_line,
                    icon: g.icon,
                })
                .collect(),
            properties: raw
                .properties
                .into_iter()
                .map(|p| ItemProperty {
                    name: p.name,
                    values: p.values,
                })
                .collect(),
            implicit_mods: raw.implicit_mods,
            explicit_mods: raw.explicit_mods,
            crafted_mods: raw.crafted_mods,
            enchant_mods: raw.enchant_mods,
            fractured_mods: raw.fractured_mods,
        }
    }
}
