//! Trade search client
//!
//! Thin client for the official trade API: a typed query builder, the
//! search call (trimmed to id, total and a capped id list) and the listing
//! fetch. Searches are user-unique, so nothing here is cached. A config
//! kill switch refuses trade calls locally without touching the network.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{Config, DEFAULT_USER_AGENT};

/// Base URL for the trade API
const TRADE_BASE_URL: &str = "https://www.pathofexile.com/api/trade";

/// Search result ids are capped to keep payloads small
const MAX_SEARCH_RESULTS: usize = 100;

/// The fetch endpoint accepts at most ten ids per call
const MAX_FETCH_IDS: usize = 10;

/// Upstream error bodies are truncated to this length in error values
const MAX_ERROR_BODY: usize = 2000;

/// Errors that can occur when talking to the trade API
#[derive(Debug, Error)]
pub enum TradeError {
    /// Trade calls are disabled by configuration
    #[error("trade search is disabled by configuration")]
    Disabled,

    /// A required request parameter was missing or empty
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}: {body}")]
    UpstreamUnavailable { status: StatusCode, body: String },

    /// Upstream payload did not parse
    #[error("malformed upstream payload: {0}")]
    UpstreamMalformed(#[from] serde_json::Error),
}

/// A trade search query, serialized to the upstream JSON shape on demand
#[derive(Debug, Clone)]
pub struct TradeQuery {
    name: String,
    online_only: bool,
    min_price: Option<f64>,
    max_price: Option<f64>,
    currency: Option<String>,
    corrupted: Option<bool>,
    identified: Option<bool>,
}

impl TradeQuery {
    /// Starts a query for an item by name, matching online sellers and
    /// sorting by ascending price.
    pub fn for_item(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            online_only: true,
            min_price: None,
            max_price: None,
            currency: None,
            corrupted: None,
            identified: None,
        }
    }

    /// Includes offline sellers.
    pub fn any_status(mut self) -> Self {
        self.online_only = false;
        self
    }

    /// Constrains the price range, in the given currency (chaos when no
    /// currency is set).
    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Price currency for the range filter.
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Filters on corruption state.
    pub fn corrupted(mut self, corrupted: bool) -> Self {
        self.corrupted = Some(corrupted);
        self
    }

    /// Filters on identification state.
    pub fn identified(mut self, identified: bool) -> Self {
        self.identified = Some(identified);
        self
    }

    /// Builds the upstream JSON body.
    pub fn to_json(&self) -> Value {
        let mut filters = json!({});

        if self.min_price.is_some() || self.max_price.is_some() {
            let mut price = json!({
                "option": self.currency.as_deref().unwrap_or("chaos"),
            });
            if let Some(min) = self.min_price {
                price["min"] = json!(min);
            }
            if let Some(max) = self.max_price {
                price["max"] = json!(max);
            }
            filters["trade_filters"] = json!({ "filters": { "price": price } });
        }

        let mut misc = json!({});
        if let Some(corrupted) = self.corrupted {
            misc["corrupted"] = json!({ "option": corrupted });
        }
        if let Some(identified) = self.identified {
            misc["identified"] = json!({ "option": identified });
        }
        if misc.as_object().is_some_and(|m| !m.is_empty()) {
            filters["misc_filters"] = json!({ "filters": misc });
        }

        json!({
            "query": {
                "status": { "option": if self.online_only { "online" } else { "any" } },
                "name": self.name,
                "filters": filters,
            },
            "sort": { "price": "asc" },
        })
    }
}

/// Trimmed search response: the search id, total hit count and a capped
/// list of result ids for the fetch endpoint
#[derive(Debug, Clone)]
pub struct TradeSearch {
    pub id: Option<String>,
    pub total: u64,
    pub result: Vec<String>,
}

/// Price attached to a listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListingPrice {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub amount: f64,
    pub currency: String,
}

/// A single fetched listing, trimmed for display
#[derive(Debug, Clone)]
pub struct TradeListing {
    pub id: String,
    pub price: Option<ListingPrice>,
    pub account_name: Option<String>,
    pub whisper: Option<String>,
    pub indexed: Option<String>,
    pub item_name: String,
    pub item_type_line: String,
    pub icon: Option<String>,
}

/// Client for the trade API
#[derive(Debug, Clone)]
pub struct TradeClient {
    client: Client,
    base_url: String,
    enabled: bool,
    user_agent: String,
}

impl TradeClient {
    /// Creates a client honoring the trade settings in `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: TRADE_BASE_URL.to_string(),
            enabled: config.trade_enabled,
            user_agent: config
                .trade_user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }

    /// Runs a search and returns the trimmed result set.
    pub async fn search(&self, league: &str, query: &TradeQuery) -> Result<TradeSearch, TradeError> {
        if !self.enabled {
            return Err(TradeError::Disabled);
        }
        if league.is_empty() {
            return Err(TradeError::InvalidRequest("league"));
        }

        let url = format!("{}/search/{}", self.base_url, encode_segment(league));
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&query.to_json())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TradeError::UpstreamUnavailable {
                status,
                body: truncate_body(&text),
            });
        }

        let raw: RawSearchResponse = serde_json::from_str(&text)?;
        Ok(trim_search_response(raw))
    }

    /// Fetches listing details for up to [`MAX_FETCH_IDS`] result ids.
    pub async fn fetch_listings(
        &self,
        search_id: &str,
        ids: &[String],
    ) -> Result<Vec<TradeListing>, TradeError> {
        if !self.enabled {
            return Err(TradeError::Disabled);
        }
        if ids.is_empty() {
            return Err(TradeError::InvalidRequest("ids"));
        }

        let capped = &ids[..ids.len().min(MAX_FETCH_IDS)];
        let url = format!("{}/fetch/{}", self.base_url, capped.join(","));
        let response = self
            .client
            .get(&url)
            .query(&[("query", search_id)])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TradeError::UpstreamUnavailable {
                status,
                body: truncate_body(&text),
            });
        }

        let raw: RawFetchResponse = serde_json::from_str(&text)?;
        Ok(raw
            .result
            .into_iter()
            .flatten()
            .map(TradeListing::from)
            .collect())
    }
}

fn encode_segment(s: &str) -> String {
    s.replace('%', "%25").replace(' ', "%20")
}

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &body[..end])
    } else {
        body.to_string()
    }
}

fn trim_search_response(raw: RawSearchResponse) -> TradeSearch {
    let mut result = raw.result.unwrap_or_default();
    result.truncate(MAX_SEARCH_RESULTS);
    TradeSearch {
        id: raw.id,
        total: raw.total.unwrap_or(0),
        result,
    }
}

/// Search wire format
#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    id: Option<String>,
    total: Option<u64>,
    result: Option<Vec<String>>,
}

/// Fetch wire format; upstream occasionally nulls individual entries
#[derive(Debug, Deserialize)]
struct RawFetchResponse {
    #[serde(default)]
    result: Vec<Option<RawListing>>,
}

#[derive(Debug, Deserialize)]
struct RawListing {
    id: String,
    listing: RawListingBody,
    item: RawListedItem,
}

#[derive(Debug, Deserialize)]
struct RawListingBody {
    price: Option<ListingPrice>,
    account: Option<RawAccount>,
    whisper: Option<String>,
    indexed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawListedItem {
    #[serde(default)]
    name: String,
    #[serde(rename = "typeLine", default)]
    type_line: String,
    icon: Option<String>,
}

impl From<RawListing> for TradeListing {
    fn from(raw: RawListing) -> Self {
        TradeListing {
            id: raw.id,
            price: raw.listing.price,
            account_name: raw.listing.account.and_then(|a| a.name),
            whisper: raw.listing.whisper,
            indexed: raw.listing.indexed,
            item_name: raw.item.name,
            item_type_line: raw.item.type_line,
            icon: raw.item.icon,
        }
    }
}
