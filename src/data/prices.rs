//! Price prediction client for poeprices.info
//!
//! Submits raw item text to the ML pricing service and returns the
//! predicted price band. The service is occasionally overloaded, so a
//! single short retry is taken on 5xx answers; its application-level error
//! codes are mapped to typed failures. Predictions are item-unique and not
//! cached.

use reqwest::{multipart::Form, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::DEFAULT_USER_AGENT;

/// Endpoint of the prediction service
const POEPRICES_URL: &str = "https://www.poeprices.info/api";

/// Delay before the single retry on a server error
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Errors that can occur when requesting a prediction
#[derive(Debug, Error)]
pub enum PricePredictionError {
    /// A required request parameter was missing or empty
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned status {status}")]
    UpstreamUnavailable { status: StatusCode },

    /// Upstream payload did not parse
    #[error("malformed upstream payload: {0}")]
    UpstreamMalformed(#[from] serde_json::Error),

    /// The service answered with one of its application error codes
    #[error("prediction service error {code}: {message}")]
    ServiceError { code: i64, message: &'static str },
}

/// A predicted price band for an item
#[derive(Debug, Clone, PartialEq)]
pub struct PricePrediction {
    /// Lower bound of the predicted price
    pub min: Option<f64>,
    /// Upper bound of the predicted price
    pub max: Option<f64>,
    /// Currency the bounds are quoted in
    pub currency: Option<String>,
    /// Model confidence, percent
    pub confidence: Option<f64>,
}

/// Client for the prediction service
#[derive(Debug, Clone)]
pub struct PricePredictionClient {
    client: Client,
    url: String,
}

impl PricePredictionClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: POEPRICES_URL.to_string(),
        }
    }

    /// Requests a price prediction for the given item text.
    pub async fn predict(
        &self,
        item_text: &str,
        league: &str,
    ) -> Result<PricePrediction, PricePredictionError> {
        if item_text.trim().is_empty() {
            return Err(PricePredictionError::InvalidRequest("item text"));
        }

        // Multipart forms are consumed on send, so each attempt builds its
        // own.
        let build_form = || {
            Form::new()
                .text("itemtext", item_text.to_string())
                .text("league", league.to_string())
                .text("language", "en")
        };

        let mut response = self
            .client
            .post(&self.url)
            .header(reqwest::header::USER_AGENT, DEFAULT_USER_AGENT)
            .multipart(build_form())
            .send()
            .await?;

        if response.status().is_server_error() {
            tokio::time::sleep(RETRY_DELAY).await;
            response = self
                .client
                .post(&self.url)
                .header(reqwest::header::USER_AGENT, DEFAULT_USER_AGENT)
                .multipart(build_form())
                .send()
                .await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(PricePredictionError::UpstreamUnavailable { status });
        }

        let text = response.text().await?;
        let raw: RawPrediction = serde_json::from_str(&text)?;
        parse_prediction(raw)
    }
}

impl Default for PricePredictionClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps the service's numeric error codes to stable messages.
fn error_message(code: i64) -> &'static str {
    match code {
        1 => "service overloaded, try again shortly",
        2 => "unsupported or invalid item text",
        3 => "league unsupported",
        4 => "rate limited, slow down",
        5 => "prediction unavailable for this item (insufficient similar data)",
        6 => "internal model error",
        _ => "unknown prediction service error",
    }
}

fn parse_prediction(raw: RawPrediction) -> Result<PricePrediction, PricePredictionError> {
    if let Some(code) = raw.error.filter(|c| *c != 0) {
        return Err(PricePredictionError::ServiceError {
            code,
            message: error_message(code),
        });
    }

    Ok(PricePrediction {
        min: raw.min,
        max: raw.max,
        currency: raw.currency,
        confidence: raw.pred_confidence_score,
    })
}

/// Prediction wire format
#[derive(Debug, Deserialize)]
struct RawPrediction {
    /// 0 on success, a documented code otherwise
    error: Option<i64>,
    min: Option<f64>,
    max: Option<f64>,
    currency: Option<String>,
    pred_confidence_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_prediction_parses() {
        let raw: RawPrediction = serde_json::from_str(
            r#"{ "error": 0, "min": 42.5, "max": 58.0, "currency": "chaos",
                 "pred_confidence_score": 81.3, "warning_msg": "" }"#,
        )
        .unwrap();

        let prediction = parse_prediction(raw).unwrap();
        assert_eq!(
            prediction,
            PricePrediction {
                min: Some(42.5),
                max: Some(58.0),
                currency: Some("chaos".to_string()),
                confidence: Some(81.3),
            }
        );
    }

    #[test]
    fn missing_error_field_counts_as_success() {
        let raw: RawPrediction =
            serde_json::from_str(r#"{ "min": 1.0, "max": 2.0, "currency": "divine" }"#).unwrap();
        assert!(parse_prediction(raw).is_ok());
    }

    #[test]
    fn known_error_codes_map_to_messages() {
        for (code, needle) in [
            (1, "overloaded"),
            (2, "item text"),
            (3, "league"),
            (4, "rate limited"),
            (5, "insufficient"),
            (6, "model"),
        ] {
            let raw: RawPrediction =
                serde_json::from_str(&format!(r#"{{ "error": {code} }}"#)).unwrap();
            match parse_prediction(raw) {
                Err(PricePredictionError::ServiceError { code: c, message }) => {
                    assert_eq!(c, code);
                    assert!(message.contains(needle), "{message} should mention {needle}");
                }
                other => panic!("expected service error, got {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_error_code_still_surfaces() {
        let raw: RawPrediction = serde_json::from_str(r#"{ "error": 99 }"#).unwrap();
        match parse_prediction(raw) {
            Err(PricePredictionError::ServiceError { code, message }) => {
                assert_eq!(code, 99);
                assert!(message.contains("unknown"));
            }
            other => panic!("expected service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_item_text_is_rejected_before_any_request() {
        let client = PricePredictionClient::new();
        let err = client.predict("   ", "Standard").await.unwrap_err();
        assert!(matches!(
            err,
            PricePredictionError::InvalidRequest("item text")
        ));
    }
}
