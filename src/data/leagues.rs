//! League list client for the publisher API
//!
//! Fetches the league catalogue, paginating defensively, and normalizes it
//! for the league picker: broad classification, "current challenge" flag,
//! guaranteed presence of the permanent leagues, and a stable sort order.

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use super::{League, LeagueKind, Realm};
use crate::cache::SharedCache;
use crate::config::DEFAULT_USER_AGENT;

/// Base URL for the publisher API
const API_BASE_URL: &str = "https://api.pathofexile.com";

/// League cache time-to-live in seconds
pub const LEAGUES_CACHE_TTL_SECS: i64 = 300;

/// Page size for the league endpoint
const PAGE_LIMIT: usize = 50;

/// Pagination safety cap; the main list normally fits one page
const MAX_OFFSET: usize = 200;

/// Errors that can occur when fetching leagues
#[derive(Debug, Error)]
pub enum LeaguesError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}")]
    UpstreamUnavailable { status: StatusCode },

    /// Upstream payload did not parse
    #[error("malformed upstream payload: {0}")]
    UpstreamMalformed(#[from] serde_json::Error),
}

/// Client for the publisher league endpoint
#[derive(Debug, Clone)]
pub struct LeaguesClient {
    client: Client,
    base_url: String,
    cache: SharedCache<Vec<League>>,
}

impl LeaguesClient {
    /// Creates a client around a cache owned by the composition root.
    pub fn new(cache: SharedCache<Vec<League>>) -> Self {
        Self {
            client: Client::new(),
            base_url: API_BASE_URL.to_string(),
            cache,
        }
    }

    /// Returns the normalized league list for a realm.
    ///
    /// Serves from cache within the TTL. On upstream failure an expired
    /// list is served when one exists; otherwise the error surfaces —
    /// there is no synthetic fallback list.
    pub async fn leagues(&self, realm: Realm) -> Result<Vec<League>, LeaguesError> {
        let key = realm.as_str();
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }

        match self.fetch_all_pages(realm).await {
            Ok(raw) => {
                let leagues = normalize_leagues(raw, realm, Utc::now());
                self.cache.put(key, leagues.clone());
                Ok(leagues)
            }
            Err(e) => {
                if let Some(stale) = self.cache.get_stale(key) {
                    warn!(realm = realm.as_str(), error = %e, "serving stale league list");
                    return Ok(stale);
                }
                Err(e)
            }
        }
    }

    /// Pages through the league endpoint until a short page or the offset
    /// cap, whichever comes first.
    async fn fetch_all_pages(&self, realm: Realm) -> Result<Vec<RawLeague>, LeaguesError> {
        let url = format!("{}/league", self.base_url);
        let mut all = Vec::new();
        let mut offset = 0usize;

        while offset < MAX_OFFSET {
            let limit = PAGE_LIMIT.to_string();
            let offset_param = offset.to_string();
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("realm", realm.as_str()),
                    ("limit", limit.as_str()),
                    ("offset", offset_param.as_str()),
                ])
                .header(reqwest::header::USER_AGENT, DEFAULT_USER_AGENT)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(LeaguesError::UpstreamUnavailable { status });
            }

            let text = response.text().await?;
            let page: Vec<RawLeague> = serde_json::from_str(&text)?;
            let page_len = page.len();
            all.extend(page);

            if page_len < PAGE_LIMIT {
                break;
            }
            offset += PAGE_LIMIT;
        }

        Ok(all)
    }
}

/// Classifies a league id into its broad kind.
fn classify(id: &str) -> LeagueKind {
    if id.eq_ignore_ascii_case("Standard") {
        LeagueKind::Standard
    } else if id.to_lowercase().contains("hardcore") {
        LeagueKind::Hardcore
    } else {
        LeagueKind::Challenge
    }
}

/// True when the league has started and not yet ended as of `now`.
fn is_active(raw: &RawLeague, now: DateTime<Utc>) -> bool {
    let started = match raw.start_at.as_deref().and_then(parse_rfc3339) {
        Some(start) => start <= now,
        None => true,
    };
    let not_ended = match raw.end_at.as_deref().and_then(parse_rfc3339) {
        Some(end) => end > now,
        None => true,
    };
    started && not_ended
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Deduplicates, classifies, backfills the permanent leagues and sorts.
fn normalize_leagues(raw: Vec<RawLeague>, realm: Realm, now: DateTime<Utc>) -> Vec<League> {
    let mut leagues: Vec<League> = Vec::new();
    for entry in raw {
        // Keep the first occurrence of each id
        if leagues.iter().any(|l| l.id == entry.id) {
            continue;
        }
        let kind = classify(&entry.id);
        let active = is_active(&entry, now);
        let permanent = kind != LeagueKind::Challenge;
        leagues.push(League {
            id: entry.id,
            realm,
            description: entry.description,
            kind,
            current: active && !permanent,
            start_at: entry.start_at,
            end_at: entry.end_at,
        });
    }

    // The paginated window can omit the permanent leagues; backfill them.
    for core in ["Hardcore", "Standard"] {
        if !leagues.iter().any(|l| l.id == core) {
            leagues.insert(
                0,
                League {
                    id: core.to_string(),
                    realm,
                    description: Some(format!("{core} League")),
                    kind: classify(core),
                    current: false,
                    start_at: None,
                    end_at: None,
                },
            );
        }
    }

    // Core leagues first, then current challenge leagues, then the rest
    // alphabetically.
    leagues.sort_by(|a, b| {
        let a_core = a.is_core();
        let b_core = b.is_core();
        if a_core != b_core {
            return if a_core {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            };
        }
        if a.current != b.current {
            return if a.current {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            };
        }
        a.id.cmp(&b.id)
    });

    leagues
}

/// League entry wire format
#[derive(Debug, Deserialize)]
struct RawLeague {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "startAt", default)]
    start_at: Option<String>,
    #[serde(rename = "endAt", default)]
    end_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
    }

    fn raw(id: &str, start: Option<&str>, end: Option<&str>) -> RawLeague {
        RawLeague {
            id: id.to_string(),
            description: None,
            start_at: start.map(str::to_string),
            end_at: end.map(str::to_string),
        }
    }

    #[test]
    fn classification() {
        assert_eq!(classify("Standard"), LeagueKind::Standard);
        assert_eq!(classify("Hardcore"), LeagueKind::Hardcore);
        assert_eq!(classify("Hardcore Mercenaries"), LeagueKind::Hardcore);
        assert_eq!(classify("Mercenaries"), LeagueKind::Challenge);
        assert_eq!(classify("SSF Mercenaries"), LeagueKind::Challenge);
    }

    #[test]
    fn active_challenge_league_is_current() {
        let leagues = normalize_leagues(
            vec![raw(
                "Mercenaries",
                Some("2025-06-06T19:00:00Z"),
                Some("2025-09-01T21:00:00Z"),
            )],
            Realm::Pc,
            now(),
        );

        let merc = leagues.iter().find(|l| l.id == "Mercenaries").unwrap();
        assert_eq!(merc.kind, LeagueKind::Challenge);
        assert!(merc.current);
    }

    #[test]
    fn ended_league_is_not_current() {
        let leagues = normalize_leagues(
            vec![raw(
                "Settlers",
                Some("2024-07-26T19:00:00Z"),
                Some("2025-03-20T21:00:00Z"),
            )],
            Realm::Pc,
            now(),
        );

        let settlers = leagues.iter().find(|l| l.id == "Settlers").unwrap();
        assert!(!settlers.current);
    }

    #[test]
    fn hardcore_variant_is_never_current() {
        let leagues = normalize_leagues(
            vec![raw(
                "Hardcore Mercenaries",
                Some("2025-06-06T19:00:00Z"),
                None,
            )],
            Realm::Pc,
            now(),
        );

        let hc = leagues
            .iter()
            .find(|l| l.id == "Hardcore Mercenaries")
            .unwrap();
        assert_eq!(hc.kind, LeagueKind::Hardcore);
        assert!(!hc.current);
    }

    #[test]
    fn permanent_leagues_are_backfilled() {
        let leagues = normalize_leagues(
            vec![raw("Mercenaries", Some("2025-06-06T19:00:00Z"), None)],
            Realm::Pc,
            now(),
        );

        assert!(leagues.iter().any(|l| l.id == "Standard"));
        assert!(leagues.iter().any(|l| l.id == "Hardcore"));
        assert_eq!(leagues.len(), 3);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let leagues = normalize_leagues(
            vec![
                RawLeague {
                    id: "Standard".to_string(),
                    description: Some("the real one".to_string()),
                    start_at: None,
                    end_at: None,
                },
                RawLeague {
                    id: "Standard".to_string(),
                    description: Some("the duplicate".to_string()),
                    start_at: None,
                    end_at: None,
                },
            ],
            Realm::Pc,
            now(),
        );

        let standards: Vec<_> = leagues.iter().filter(|l| l.id == "Standard").collect();
        assert_eq!(standards.len(), 1);
        assert_eq!(standards[0].description.as_deref(), Some("the real one"));
    }

    #[test]
    fn sort_puts_core_first_then_current_then_alphabetical() {
        let leagues = normalize_leagues(
            vec![
                raw("Zzz Event", Some("2020-01-01T00:00:00Z"), Some("2020-02-01T00:00:00Z")),
                raw("Mercenaries", Some("2025-06-06T19:00:00Z"), None),
                raw("Standard", None, None),
                raw("Hardcore", None, None),
                raw("Aaa Event", Some("2020-01-01T00:00:00Z"), Some("2020-02-01T00:00:00Z")),
            ],
            Realm::Pc,
            now(),
        );

        let ids: Vec<&str> = leagues.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["Hardcore", "Standard", "Mercenaries", "Aaa Event", "Zzz Event"]);
    }

    #[test]
    fn missing_timestamps_mean_active() {
        let leagues = normalize_leagues(vec![raw("Mercenaries", None, None)], Realm::Pc, now());
        assert!(leagues.iter().find(|l| l.id == "Mercenaries").unwrap().current);
    }
}
