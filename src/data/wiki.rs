//! Wiki article client
//!
//! Retrieves game-wiki article HTML for in-app display. The community wiki
//! is the primary source (tried twice), with the poedb mirror as the last
//! candidate. Only the main content region is kept, scripts, styles,
//! comments and inline event handlers are stripped, and articles are capped
//! in size. Articles change rarely, so the cache window is long.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::warn;

use super::fallback::{resolve_candidates, Exhausted};
use crate::cache::SharedCache;
use crate::config::DEFAULT_USER_AGENT;

/// Base URL of the community wiki
const WIKI_BASE_URL: &str = "https://www.poewiki.net/wiki";

/// Base URL of the poedb mirror
const POEDB_BASE_URL: &str = "https://poedb.tw/us";

/// Article cache time-to-live in seconds
pub const WIKI_CACHE_TTL_SECS: i64 = 6 * 60 * 60;

/// Articles are truncated beyond this many bytes of markup
const MAX_ARTICLE_LEN: usize = 30_000;

static WIKI_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div id="mw-content-text".*?<div class="printfooter">"#)
        .expect("static regex")
});
static WIKI_CONTENT_ALT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div id="mw-content-text".*?</div>\s*<div id="catlinks""#)
        .expect("static regex")
});
static POEDB_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)<main[^>]*>.*?</main>").expect("static regex"));
static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)<script.*?</script>").expect("static regex"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?si)<style.*?</style>").expect("static regex"));
static HTML_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
static EVENT_HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i) on[a-z]+="[^"]*""#).expect("static regex"));
static TITLE_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^A-Za-z0-9 _'"-]"#).expect("static regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Errors that can occur when fetching wiki content
#[derive(Debug, Error)]
pub enum WikiError {
    /// The title was empty after sanitization
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}")]
    UpstreamUnavailable { status: StatusCode },

    /// The page loaded but no recognizable content region was found
    #[error("no content region found in the page")]
    ContentNotFound,

    /// Every source failed
    #[error("all {attempts} wiki sources failed")]
    SourcesExhausted {
        attempts: usize,
        #[source]
        last: Box<WikiError>,
    },
}

/// The places an article can come from, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WikiSource {
    Wiki,
    PoeDb,
}

/// Client for wiki article retrieval
#[derive(Debug, Clone)]
pub struct WikiClient {
    client: Client,
    wiki_base: String,
    poedb_base: String,
    cache: SharedCache<String>,
}

impl WikiClient {
    /// Creates a client around a cache owned by the composition root.
    pub fn new(cache: SharedCache<String>) -> Self {
        Self {
            client: Client::new(),
            wiki_base: WIKI_BASE_URL.to_string(),
            poedb_base: POEDB_BASE_URL.to_string(),
            cache,
        }
    }

    /// Returns sanitized article HTML for a page title.
    ///
    /// The wiki is tried twice before the mirror. On failure of every
    /// source a stale article is served when one exists; otherwise the
    /// aggregate error surfaces — no placeholder page is fabricated.
    pub async fn article(&self, title: &str) -> Result<String, WikiError> {
        let title = sanitize_title(title);
        if title.is_empty() {
            return Err(WikiError::InvalidRequest("title"));
        }
        let key = title.to_lowercase();

        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        // The wiki occasionally serves transient errors, so it gets a
        // second chance before falling back to the mirror.
        let sources = [WikiSource::Wiki, WikiSource::Wiki, WikiSource::PoeDb];
        let result = resolve_candidates(
            sources,
            |source| self.fetch_from(source, &title),
            || WikiError::InvalidRequest("no sources"),
        )
        .await;

        match result {
            Ok(content) => {
                let content = sanitize_article(&content);
                self.cache.put(&key, content.clone());
                Ok(content)
            }
            Err(Exhausted { attempts, last }) => {
                if let Some(stale) = self.cache.get_stale(&key) {
                    warn!(title = %title, error = %last, "serving stale wiki article");
                    return Ok(stale);
                }
                Err(WikiError::SourcesExhausted {
                    attempts,
                    last: Box::new(last),
                })
            }
        }
    }

    async fn fetch_from(&self, source: WikiSource, title: &str) -> Result<String, WikiError> {
        let url = match source {
            WikiSource::Wiki => format!("{}/{}", self.wiki_base, encode_title(title)),
            WikiSource::PoeDb => format!("{}/{}", self.poedb_base, encode_title(title)),
        };

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, DEFAULT_USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WikiError::UpstreamUnavailable { status });
        }

        let html = response.text().await?;
        match source {
            WikiSource::Wiki => extract_wiki_content(&html).ok_or(WikiError::ContentNotFound),
            WikiSource::PoeDb => extract_poedb_content(&html).ok_or(WikiError::ContentNotFound),
        }
    }
}

/// Restricts a raw title to the characters wiki page names use and joins
/// words with underscores, MediaWiki style.
fn sanitize_title(raw: &str) -> String {
    let cleaned = TITLE_DISALLOWED.replace_all(raw, "");
    WHITESPACE_RUN
        .replace_all(cleaned.trim(), "_")
        .into_owned()
}

fn encode_title(title: &str) -> String {
    title.replace('%', "%25").replace('"', "%22").replace('\'', "%27")
}

/// Pulls the MediaWiki main-content region out of a full page.
fn extract_wiki_content(html: &str) -> Option<String> {
    WIKI_CONTENT
        .find(html)
        .or_else(|| WIKI_CONTENT_ALT.find(html))
        .map(|m| m.as_str().to_string())
}

/// Pulls the central content block out of a poedb page, tagged so the
/// renderer can tell the source apart.
fn extract_poedb_content(html: &str) -> Option<String> {
    POEDB_CONTENT
        .find(html)
        .map(|m| format!(r#"<div class="poedb-source">{}</div>"#, m.as_str()))
}

/// Strips active content and caps the article size.
fn sanitize_article(content: &str) -> String {
    let stripped = SCRIPT_BLOCK.replace_all(content, "");
    let stripped = STYLE_BLOCK.replace_all(&stripped, "");
    let stripped = HTML_COMMENT.replace_all(&stripped, "");
    let stripped = EVENT_HANDLER.replace_all(&stripped, "");

    let mut article = stripped.into_owned();
    if article.len() > MAX_ARTICLE_LEN {
        let mut end = MAX_ARTICLE_LEN;
        while !article.is_char_boundary(end) {
            end -= 1;
        }
        article.truncate(end);
        article.push_str("<p><em>[Truncated]</em></p>");
    }
    article
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_sanitization() {
        assert_eq!(sanitize_title("Divine Orb"), "Divine_Orb");
        assert_eq!(sanitize_title("Kaom's Heart"), "Kaom's_Heart");
        assert_eq!(sanitize_title("  The   Doctor  "), "The_Doctor");
        assert_eq!(sanitize_title("<script>alert(1)</script>"), "scriptalert1script");
        assert_eq!(sanitize_title("!!!"), "");
    }

    #[test]
    fn wiki_content_extraction() {
        let page = r#"<html><head><title>Divine Orb</title></head><body>
            <div id="mw-content-text" class="mw-body-content">
              <p>A Divine Orb is a currency item.</p>
            <div class="printfooter">Retrieved from</div>
            </body></html>"#;

        let content = extract_wiki_content(page).unwrap();
        assert!(content.contains("A Divine Orb is a currency item."));
        assert!(content.starts_with(r#"<div id="mw-content-text""#));
    }

    #[test]
    fn wiki_extraction_falls_back_to_catlinks_boundary() {
        let page = r#"<div id="mw-content-text"><p>Body</p></div>
            <div id="catlinks">Categories</div>"#;
        let content = extract_wiki_content(page).unwrap();
        assert!(content.contains("<p>Body</p>"));
    }

    #[test]
    fn wiki_extraction_fails_without_content_region() {
        assert!(extract_wiki_content("<html><body>nothing here</body></html>").is_none());
    }

    #[test]
    fn poedb_extraction_wraps_the_block() {
        let page = r#"<html><body><main id="main"><h1>Divine Orb</h1></main></body></html>"#;
        let content = extract_poedb_content(page).unwrap();
        assert!(content.starts_with(r#"<div class="poedb-source">"#));
        assert!(content.contains("<h1>Divine Orb</h1>"));
    }

    #[test]
    fn sanitize_strips_scripts_styles_comments_and_handlers() {
        let dirty = r##"<div><script>steal()</script><style>.x{}</style>
            <!-- secret --><a href="#" onclick="evil()">link</a></div>"##;
        let clean = sanitize_article(dirty);

        assert!(!clean.contains("<script"));
        assert!(!clean.contains("<style"));
        assert!(!clean.contains("secret"));
        assert!(!clean.contains("onclick"));
        assert!(clean.contains(r##"<a href="#">link</a>"##));
    }

    #[test]
    fn oversized_articles_are_truncated_with_marker() {
        let big = format!("<div>{}</div>", "a".repeat(40_000));
        let article = sanitize_article(&big);

        assert!(article.len() <= MAX_ARTICLE_LEN + 40);
        assert!(article.ends_with("<p><em>[Truncated]</em></p>"));
    }

    #[test]
    fn small_articles_are_untouched() {
        let small = "<p>short</p>";
        assert_eq!(sanitize_article(small), small);
    }

    #[test]
    fn title_encoding_for_urls() {
        assert_eq!(encode_title("Kaom's_Heart"), "Kaom%27s_Heart");
        assert_eq!(encode_title("Divine_Orb"), "Divine_Orb");
    }
}
