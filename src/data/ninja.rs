//! poe.ninja price overview client
//!
//! Fetches currency and item overviews from the poe.ninja aggregation API
//! and normalizes them into our price-line structures. Responses are cached
//! for a short window so repeated views of the same league/category answer
//! from memory instead of re-fetching.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use super::fallback::{resolve_candidates, Exhausted};
use super::{CurrencyLine, ExchangeSide, ItemLine, ItemType, Realm, SparkLine};
use crate::cache::SharedCache;

/// Base URL for the poe.ninja data API
const NINJA_BASE_URL: &str = "https://poe.ninja/api/data";

/// Overview cache time-to-live in seconds
pub const OVERVIEW_CACHE_TTL_SECS: i64 = 60;

/// The details id of the Divine Orb line, used to derive divine values
const DIVINE_DETAILS_ID: &str = "divine-orb";

/// Currency overview categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrencyKind {
    Currency,
    Fragment,
}

impl CurrencyKind {
    /// Wire name for the overview `type` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyKind::Currency => "Currency",
            CurrencyKind::Fragment => "Fragment",
        }
    }
}

/// Errors that can occur when fetching price overviews
#[derive(Debug, Error)]
pub enum NinjaError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}")]
    UpstreamUnavailable { status: StatusCode },

    /// Upstream payload did not parse
    #[error("malformed upstream payload: {0}")]
    UpstreamMalformed(#[from] serde_json::Error),

    /// Upstream answered but the overview carried no lines
    #[error("overview '{type_name}' has no lines")]
    EmptyOverview { type_name: String },

    /// Every name variant for a category failed
    #[error("all {attempts} name variants for '{type_name}' failed")]
    VariantsExhausted {
        type_name: String,
        attempts: usize,
        #[source]
        last: Box<NinjaError>,
    },
}

/// A normalized currency overview
#[derive(Debug, Clone)]
pub struct CurrencyOverview {
    /// Price lines with icons joined and divine values derived
    pub lines: Vec<CurrencyLine>,
    /// Chaos value of one Divine Orb, when the overview contained it
    pub divine_chaos: Option<f64>,
}

/// Client for the poe.ninja overview endpoints
#[derive(Debug, Clone)]
pub struct NinjaClient {
    client: Client,
    base_url: String,
    currency_cache: SharedCache<CurrencyOverview>,
    item_cache: SharedCache<Vec<ItemLine>>,
}

impl NinjaClient {
    /// Creates a client around caches owned by the composition root.
    pub fn new(
        currency_cache: SharedCache<CurrencyOverview>,
        item_cache: SharedCache<Vec<ItemLine>>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: NINJA_BASE_URL.to_string(),
            currency_cache,
            item_cache,
        }
    }

    /// Cache fingerprint for an overview request. The realm participates in
    /// the key even though the upstream query omits it, so distinct realms
    /// never observe each other's snapshots.
    fn overview_key(realm: Realm, league: &str, type_name: &str) -> String {
        format!("{}:{}:{}", realm.as_str(), league, type_name)
    }

    /// Fetches the currency or fragment overview for a league.
    ///
    /// Serves from cache within the TTL. On upstream failure an expired
    /// snapshot is served when one exists; otherwise the error surfaces.
    pub async fn currency_overview(
        &self,
        realm: Realm,
        league: &str,
        kind: CurrencyKind,
    ) -> Result<CurrencyOverview, NinjaError> {
        let key = Self::overview_key(realm, league, kind.as_str());
        if let Some(hit) = self.currency_cache.get(&key) {
            return Ok(hit);
        }

        match self.fetch_currency(league, kind).await {
            Ok(overview) => {
                self.currency_cache.put(&key, overview.clone());
                Ok(overview)
            }
            Err(e) => {
                if let Some(stale) = self.currency_cache.get_stale(&key) {
                    warn!(league, kind = kind.as_str(), error = %e, "serving stale currency overview");
                    return Ok(stale);
                }
                Err(e)
            }
        }
    }

    /// Fetches the item overview for a league and category.
    ///
    /// Categories with uncertain upstream naming fall through their alias
    /// variants in order; an overview that is empty under every name is an
    /// empty result, not an error.
    pub async fn item_overview(
        &self,
        realm: Realm,
        league: &str,
        item_type: ItemType,
    ) -> Result<Vec<ItemLine>, NinjaError> {
        let key = Self::overview_key(realm, league, item_type.as_str());
        if let Some(hit) = self.item_cache.get(&key) {
            return Ok(hit);
        }

        match self.fetch_item_overview(league, item_type).await {
            Ok(lines) => {
                self.item_cache.put(&key, lines.clone());
                Ok(lines)
            }
            Err(e) => {
                if let Some(stale) = self.item_cache.get_stale(&key) {
                    warn!(league, item_type = item_type.as_str(), error = %e, "serving stale item overview");
                    return Ok(stale);
                }
                Err(e)
            }
        }
    }

    async fn fetch_currency(
        &self,
        league: &str,
        kind: CurrencyKind,
    ) -> Result<CurrencyOverview, NinjaError> {
        let url = format!("{}/currencyoverview", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("league", league), ("type", kind.as_str()), ("language", "en")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NinjaError::UpstreamUnavailable { status });
        }

        let text = response.text().await?;
        let raw: CurrencyOverviewResponse = serde_json::from_str(&text)?;
        Ok(normalize_currency_overview(raw))
    }

    async fn fetch_item_overview(
        &self,
        league: &str,
        item_type: ItemType,
    ) -> Result<Vec<ItemLine>, NinjaError> {
        let names: Vec<&'static str> = std::iter::once(item_type.as_str())
            .chain(item_type.aliases().iter().copied())
            .collect();

        let result = resolve_candidates(
            names,
            |name| self.fetch_item_lines(league, name),
            || NinjaError::EmptyOverview {
                type_name: item_type.as_str().to_string(),
            },
        )
        .await;

        match result {
            Ok(lines) => Ok(lines),
            // Empty under every known name: the upstream has nothing for
            // this category right now, which is a valid answer.
            Err(Exhausted {
                last: NinjaError::EmptyOverview { .. },
                ..
            }) => Ok(Vec::new()),
            Err(Exhausted { attempts, last }) => Err(NinjaError::VariantsExhausted {
                type_name: item_type.as_str().to_string(),
                attempts,
                last: Box::new(last),
            }),
        }
    }

    async fn fetch_item_lines(
        &self,
        league: &str,
        type_name: &'static str,
    ) -> Result<Vec<ItemLine>, NinjaError> {
        let url = format!("{}/itemoverview", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("league", league), ("type", type_name), ("language", "en")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NinjaError::UpstreamUnavailable { status });
        }

        let text = response.text().await?;
        let raw: ItemOverviewResponse = serde_json::from_str(&text)?;
        if raw.lines.is_empty() {
            return Err(NinjaError::EmptyOverview {
                type_name: type_name.to_string(),
            });
        }

        Ok(raw.lines.into_iter().map(ItemLine::from).collect())
    }
}

/// Joins icons onto lines and derives divine values from the divine line.
fn normalize_currency_overview(raw: CurrencyOverviewResponse) -> CurrencyOverview {
    let divine_chaos = raw
        .lines
        .iter()
        .find(|line| line.details_id == DIVINE_DETAILS_ID)
        .and_then(|line| line.chaos_equivalent)
        .filter(|v| *v > 0.0);

    let lines = raw
        .lines
        .into_iter()
        .map(|line| {
            let icon = raw
                .currency_details
                .iter()
                .find(|det| det.name == line.currency_type_name)
                .and_then(|det| det.icon.clone());
            let divine_equivalent = match (line.chaos_equivalent, divine_chaos) {
                (Some(chaos), Some(divine)) => Some(chaos / divine),
                _ => None,
            };
            CurrencyLine {
                currency_type_name: line.currency_type_name,
                chaos_equivalent: line.chaos_equivalent,
                divine_equivalent,
                details_id: line.details_id,
                icon,
                pay: line.pay,
                receive: line.receive,
                pay_spark_line: line.pay_spark_line,
                receive_spark_line: line.receive_spark_line,
            }
        })
        .collect();

    CurrencyOverview {
        lines,
        divine_chaos,
    }
}

/// Currency overview wire format
#[derive(Debug, Deserialize)]
struct CurrencyOverviewResponse {
    #[serde(default)]
    lines: Vec<RawCurrencyLine>,
    #[serde(rename = "currencyDetails", default)]
    currency_details: Vec<RawCurrencyDetail>,
}

#[derive(Debug, Deserialize)]
struct RawCurrencyLine {
    #[serde(rename = "currencyTypeName")]
    currency_type_name: String,
    #[serde(rename = "chaosEquivalent")]
    chaos_equivalent: Option<f64>,
    #[serde(rename = "detailsId", default)]
    details_id: String,
    pay: Option<ExchangeSide>,
    receive: Option<ExchangeSide>,
    #[serde(rename = "paySparkLine")]
    pay_spark_line: Option<SparkLine>,
    #[serde(rename = "receiveSparkLine")]
    receive_spark_line: Option<SparkLine>,
}

#[derive(Debug, Deserialize)]
struct RawCurrencyDetail {
    name: String,
    icon: Option<String>,
}

/// Item overview wire format
#[derive(Debug, Deserialize)]
struct ItemOverviewResponse {
    #[serde(default)]
    lines: Vec<RawItemLine>,
}

#[derive(Debug, Deserialize)]
struct RawItemLine {
    name: String,
    #[serde(rename = "baseType")]
    base_type: Option<String>,
    #[serde(rename = "chaosValue")]
    chaos_value: Option<f64>,
    #[serde(rename = "divineValue")]
    divine_value: Option<f64>,
    icon: Option<String>,
    #[serde(rename = "detailsId")]
    details_id: Option<String>,
    #[serde(rename = "listingCount")]
    listing_count: Option<u32>,
    sparkline: Option<SparkLine>,
    #[serde(rename = "mapTier")]
    map_tier: Option<u32>,
    #[serde(rename = "gemLevel")]
    gem_level: Option<u32>,
    links: Option<u32>,
}

impl From<RawItemLine> for ItemLine {
    fn from(raw: RawItemLine) -> Self {
        ItemLine {
            name: raw.name,
            base_type: raw.base_type,
            chaos_value: raw.chaos_value,
            divine_value: raw.divine_value,
            icon: raw.icon,
            details_id: raw.details_id,
            listing_count: raw.listing_count,
            spark_line: raw.sparkline,
            map_tier: raw.map_tier.filter(|t| *t > 0),
            gem_level: raw.gem_level,
            links: raw.links.filter(|l| *l > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trimmed currencyoverview payload with two lines and one detail entry
    const CURRENCY_RESPONSE: &str = r#"{
        "lines": [
            {
                "currencyTypeName": "Divine Orb",
                "pay": {
                    "id": 1, "league_id": 220, "pay_currency_id": 3, "get_currency_id": 1,
                    "sample_time_utc": "2025-06-01T12:00:00Z",
                    "count": 120, "value": 0.0055, "data_point_count": 60, "includes_secondary": true
                },
                "receive": {
                    "id": 2, "league_id": 220, "pay_currency_id": 1, "get_currency_id": 3,
                    "sample_time_utc": "2025-06-01T12:00:00Z",
                    "count": 180, "value": 182.5, "data_point_count": 60, "includes_secondary": true
                },
                "paySparkLine": { "data": [0.0, -0.4, null, -1.1], "totalChange": -1.1 },
                "receiveSparkLine": { "data": [0.0, 0.8, 1.4, 2.0], "totalChange": 2.0 },
                "chaosEquivalent": 182.5,
                "detailsId": "divine-orb"
            },
            {
                "currencyTypeName": "Orb of Alchemy",
                "receive": {
                    "id": 7, "league_id": 220, "pay_currency_id": 1, "get_currency_id": 10,
                    "sample_time_utc": "2025-06-01T12:00:00Z",
                    "count": 45, "value": 0.25, "data_point_count": 30, "includes_secondary": false
                },
                "chaosEquivalent": 0.25,
                "detailsId": "orb-of-alchemy"
            }
        ],
        "currencyDetails": [
            { "id": 3, "icon": "https://web.poecdn.com/divine.png", "name": "Divine Orb", "tradeId": "divine" }
        ]
    }"#;

    /// Trimmed itemoverview payload
    const ITEM_RESPONSE: &str = r#"{
        "lines": [
            {
                "id": 1,
                "name": "Headhunter",
                "baseType": "Leather Belt",
                "icon": "https://web.poecdn.com/hh.png",
                "links": 0,
                "itemClass": 3,
                "sparkline": { "data": [0.0, null, 4.2], "totalChange": 4.2 },
                "chaosValue": 9800.0,
                "divineValue": 53.7,
                "count": 18,
                "detailsId": "headhunter",
                "listingCount": 27
            },
            {
                "id": 2,
                "name": "Crimson Temple",
                "mapTier": 13,
                "icon": "https://web.poecdn.com/ct.png",
                "chaosValue": 3.0,
                "divineValue": 0.02,
                "detailsId": "crimson-temple-t13",
                "listingCount": 140
            }
        ]
    }"#;

    #[test]
    fn currency_overview_joins_icons_and_derives_divine() {
        let raw: CurrencyOverviewResponse = serde_json::from_str(CURRENCY_RESPONSE).unwrap();
        let overview = normalize_currency_overview(raw);

        assert_eq!(overview.divine_chaos, Some(182.5));
        assert_eq!(overview.lines.len(), 2);

        let divine = &overview.lines[0];
        assert_eq!(divine.currency_type_name, "Divine Orb");
        assert_eq!(divine.icon.as_deref(), Some("https://web.poecdn.com/divine.png"));
        assert!((divine.divine_equivalent.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(divine.receive.as_ref().unwrap().count, 180);

        let alch = &overview.lines[1];
        assert!(alch.icon.is_none());
        assert!((alch.divine_equivalent.unwrap() - 0.25 / 182.5).abs() < 1e-9);
    }

    #[test]
    fn currency_overview_without_divine_line_has_no_divine_values() {
        let raw: CurrencyOverviewResponse = serde_json::from_str(
            r#"{"lines": [{"currencyTypeName": "Orb of Alchemy", "chaosEquivalent": 0.25, "detailsId": "orb-of-alchemy"}]}"#,
        )
        .unwrap();
        let overview = normalize_currency_overview(raw);

        assert_eq!(overview.divine_chaos, None);
        assert_eq!(overview.lines[0].divine_equivalent, None);
    }

    #[test]
    fn currency_sparklines_keep_gaps() {
        let raw: CurrencyOverviewResponse = serde_json::from_str(CURRENCY_RESPONSE).unwrap();
        let overview = normalize_currency_overview(raw);

        let pay = overview.lines[0].pay_spark_line.as_ref().unwrap();
        assert_eq!(pay.data, vec![Some(0.0), Some(-0.4), None, Some(-1.1)]);
        assert!((pay.total_change - (-1.1)).abs() < f64::EPSILON);
    }

    #[test]
    fn item_lines_map_fields_and_drop_zero_tiers() {
        let raw: ItemOverviewResponse = serde_json::from_str(ITEM_RESPONSE).unwrap();
        let lines: Vec<ItemLine> = raw.lines.into_iter().map(ItemLine::from).collect();

        let hh = &lines[0];
        assert_eq!(hh.name, "Headhunter");
        assert_eq!(hh.base_type.as_deref(), Some("Leather Belt"));
        assert_eq!(hh.chaos_value, Some(9800.0));
        assert_eq!(hh.listing_count, Some(27));
        // links: 0 means unlinked, carried as absent
        assert_eq!(hh.links, None);
        assert_eq!(hh.map_tier, None);

        let map = &lines[1];
        assert_eq!(map.map_tier, Some(13));
        assert!(map.spark_line.is_none());
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let result: Result<CurrencyOverviewResponse, _> = serde_json::from_str("{ not json }");
        assert!(result.is_err());
    }

    #[test]
    fn overview_key_distinguishes_realm_league_and_type() {
        let a = NinjaClient::overview_key(Realm::Pc, "Standard", "Currency");
        let b = NinjaClient::overview_key(Realm::Xbox, "Standard", "Currency");
        let c = NinjaClient::overview_key(Realm::Pc, "Standard", "Fragment");
        let d = NinjaClient::overview_key(Realm::Pc, "Mercenaries", "Currency");

        assert_eq!(a, "pc:Standard:Currency");
        assert!(a != b && a != c && a != d && b != c);
    }
}
