// ABOUTME: Fitbit Web API adapter for body weight and body fat log time series
// ABOUTME: Handles bearer auth from the credential store, token refresh, and error mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Remote source adapter for the Fitbit body logs.
//!
//! Fetches `body/log/weight` and `body/log/fat` time series. Fitbit caps
//! body-log range queries at 31 days, so long windows are walked in
//! month-sized chunks and concatenated. Values arrive already converted:
//! weight in kilograms, fat in percentage points.

use crate::config::FitbitConfig;
use crate::models::{BodyMeasurement, DateRange};
use crate::oauth::{OAuthClient, TokenData, TOKEN_STORE_KEY};
use crate::providers::{MeasurementProvider, ProviderError};
use crate::token_store::CredentialStore;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use serde_json::from_str;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

const PROVIDER_NAME: &str = "fitbit";

/// Fitbit body-log responses span at most 31 days per request.
const MAX_WINDOW_DAYS: i64 = 31;

/// Fitbit API error response format.
#[derive(Debug, Deserialize)]
struct FitbitErrorResponse {
    errors: Option<Vec<FitbitError>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FitbitError {
    error_type: Option<String>,
    message: Option<String>,
}

/// Body weight log API response.
#[derive(Debug, Deserialize)]
struct FitbitWeightResponse {
    weight: Vec<FitbitWeightLog>,
}

/// One weight log entry: date plus weight in kg.
#[derive(Debug, Deserialize)]
struct FitbitWeightLog {
    date: String,
    weight: f64,
}

/// Body fat log API response.
#[derive(Debug, Deserialize)]
struct FitbitFatResponse {
    fat: Vec<FitbitFatLog>,
}

/// One fat log entry: date plus body fat percentage.
#[derive(Debug, Deserialize)]
struct FitbitFatLog {
    date: String,
    fat: f64,
}

/// Fitbit Web API provider.
pub struct FitbitProvider {
    config: FitbitConfig,
    store: Arc<dyn CredentialStore>,
    oauth: OAuthClient,
    client: reqwest::Client,
}

impl FitbitProvider {
    /// Create a provider reading its bearer credential from `store`.
    #[must_use]
    pub fn new(config: FitbitConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            oauth: OAuthClient::new(config.clone()),
            config,
            store,
            client: reqwest::Client::new(),
        }
    }

    /// Load the persisted token, surfacing its absence as an auth error.
    fn load_token(&self) -> Result<TokenData, ProviderError> {
        let raw = self
            .store
            .get(TOKEN_STORE_KEY)
            .map_err(|e| ProviderError::Store {
                provider: PROVIDER_NAME,
                detail: e.to_string(),
            })?
            .ok_or_else(|| ProviderError::Auth {
                provider: PROVIDER_NAME,
                reason: "no stored credential; run the auth flow first".to_owned(),
            })?;

        from_str(&raw).map_err(|e| ProviderError::Store {
            provider: PROVIDER_NAME,
            detail: format!("stored credential is not valid token JSON: {e}"),
        })
    }

    /// Return a usable access token, refreshing and re-persisting when the
    /// stored one is within five minutes of expiry.
    async fn ensure_access_token(&self) -> Result<String, ProviderError> {
        let token = self.load_token()?;
        if token.is_fresh() {
            return Ok(token.access_token);
        }

        debug!("stored Fitbit token stale, refreshing");
        let refreshed = self
            .oauth
            .refresh_token(&token.refresh_token)
            .await
            .map_err(|e| ProviderError::Auth {
                provider: PROVIDER_NAME,
                reason: e.to_string(),
            })?;

        let serialized =
            serde_json::to_string(&refreshed).map_err(|e| ProviderError::Store {
                provider: PROVIDER_NAME,
                detail: format!("serializing refreshed token: {e}"),
            })?;
        self.store
            .set(TOKEN_STORE_KEY, &serialized)
            .map_err(|e| ProviderError::Store {
                provider: PROVIDER_NAME,
                detail: e.to_string(),
            })?;

        Ok(refreshed.access_token)
    }

    /// Map a non-success API response to a structured error.
    fn handle_api_error(status: reqwest::StatusCode, text: &str, url: &str) -> ProviderError {
        error!(
            "Fitbit API request failed - status: {status}, url: {url}, body_length: {} bytes",
            text.len()
        );

        let mut message = format!("request failed with status {status}");
        if let Ok(parsed) = from_str::<FitbitErrorResponse>(text) {
            if let Some(first) = parsed.errors.into_iter().flatten().next() {
                let error_type = first.error_type.unwrap_or_default();
                let detail = first.message.unwrap_or_default();
                message = if error_type.is_empty() {
                    detail
                } else {
                    format!("{error_type}: {detail}")
                };
            }
        }

        ProviderError::Api {
            provider: PROVIDER_NAME,
            status_code: status.as_u16(),
            message,
            retryable: status.as_u16() >= 500,
        }
    }

    /// Make an authenticated GET request and decode the JSON body.
    async fn api_request<T>(&self, endpoint: &str) -> Result<T, ProviderError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let access_token = self.ensure_access_token().await?;

        let url = format!(
            "{}/{}",
            self.config.api_base_url,
            endpoint.trim_start_matches('/')
        );
        debug!("making HTTP GET request to: {url}");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                provider: PROVIDER_NAME,
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::handle_api_error(status, &text, &url));
        }

        response.json().await.map_err(|e| ProviderError::Decode {
            provider: PROVIDER_NAME,
            detail: e.to_string(),
        })
    }

    /// Split a range into windows Fitbit will accept.
    fn windows(range: &DateRange) -> Vec<(NaiveDate, NaiveDate)> {
        let mut out = Vec::new();
        let mut cursor = range.start;
        while cursor <= range.end {
            let window_end = (cursor + Duration::days(MAX_WINDOW_DAYS - 1)).min(range.end);
            out.push((cursor, window_end));
            cursor = window_end + Duration::days(1);
        }
        out
    }

    /// Parse-boundary conversion: validate and normalize one log row.
    ///
    /// The core invariant (no NaN, no negative values) is enforced here;
    /// malformed rows are skipped with a warning rather than failing the
    /// whole fetch.
    fn convert_log(date: &str, value: f64) -> Option<BodyMeasurement> {
        let day = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(day) => day,
            Err(e) => {
                warn!("skipping Fitbit log with unparseable date '{date}': {e}");
                return None;
            }
        };
        if !value.is_finite() || value < 0.0 {
            warn!("skipping Fitbit log on {date} with invalid value {value}");
            return None;
        }

        // Date-only rows map to midnight UTC of the reported day.
        let recorded_at = day.and_hms_opt(0, 0, 0)?.and_utc();

        Some(BodyMeasurement::new(
            recorded_at,
            value,
            Some(PROVIDER_NAME.to_owned()),
        ))
    }
}

#[async_trait]
impl MeasurementProvider for FitbitProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    #[instrument(skip(self), fields(provider = "fitbit", api_call = "fetch_weight"))]
    async fn fetch_weight(
        &self,
        range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        let mut entries = Vec::new();
        for (start, end) in Self::windows(range) {
            let endpoint = format!(
                "user/-/body/log/weight/date/{}/{}.json",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            );
            let response: FitbitWeightResponse = self.api_request(&endpoint).await?;
            entries.extend(
                response
                    .weight
                    .iter()
                    .filter_map(|log| Self::convert_log(&log.date, log.weight)),
            );
        }
        debug!("fetched {} Fitbit weight entries", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self), fields(provider = "fitbit", api_call = "fetch_body_fat"))]
    async fn fetch_body_fat(
        &self,
        range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        let mut entries = Vec::new();
        for (start, end) in Self::windows(range) {
            let endpoint = format!(
                "user/-/body/log/fat/date/{}/{}.json",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            );
            let response: FitbitFatResponse = self.api_request(&endpoint).await?;
            entries.extend(
                response
                    .fat
                    .iter()
                    .filter_map(|log| Self::convert_log(&log.date, log.fat)),
            );
        }
        debug!("fetched {} Fitbit body fat entries", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn windows_split_at_31_days() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        let windows = FitbitProvider::windows(&range);

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(windows[0].1, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(windows[1].0, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(windows[1].1, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn windows_cover_single_day_range() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let windows = FitbitProvider::windows(&DateRange::new(day, day));
        assert_eq!(windows, vec![(day, day)]);
    }

    #[test]
    fn convert_log_maps_date_to_midnight_utc() {
        let entry = FitbitProvider::convert_log("2025-04-02", 81.3).unwrap();
        assert_eq!(entry.value, 81.3);
        assert_eq!(entry.recorded_at.to_rfc3339(), "2025-04-02T00:00:00+00:00");
        assert_eq!(entry.source.as_deref(), Some("fitbit"));
    }

    #[test]
    fn convert_log_rejects_malformed_rows() {
        assert!(FitbitProvider::convert_log("not-a-date", 80.0).is_none());
        assert!(FitbitProvider::convert_log("2025-04-02", f64::NAN).is_none());
        assert!(FitbitProvider::convert_log("2025-04-02", -1.0).is_none());
    }

    #[test]
    fn error_body_parsing_prefers_fitbit_detail() {
        let body = r#"{"errors":[{"errorType":"expired_token","message":"Access token expired"}]}"#;
        let err =
            FitbitProvider::handle_api_error(reqwest::StatusCode::UNAUTHORIZED, body, "test-url");
        match &err {
            ProviderError::Api {
                status_code,
                message,
                retryable,
                ..
            } => {
                assert_eq!(*status_code, 401);
                assert!(message.contains("expired_token"));
                assert!(!retryable);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(err.is_auth_rejected());
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = FitbitProvider::handle_api_error(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "",
            "test-url",
        );
        match &err {
            ProviderError::Api { retryable, .. } => assert!(*retryable),
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(!err.is_auth_rejected());
    }
}
