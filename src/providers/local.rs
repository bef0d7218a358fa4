// ABOUTME: Local health-store adapter reading a JSON export of body measurements
// ABOUTME: Filters rows by date range and applies the same parse-boundary validation as remote
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Local source adapter.
//!
//! The on-device health store itself is an external capability; this
//! adapter consumes a JSON export snapshot of it. The export carries one
//! array per metric, each row a calendar date, a value, and an optional
//! device label:
//!
//! ```json
//! {
//!   "weight":   [{"date": "2025-03-10", "value": 80.2, "source": "Bathroom Scale"}],
//!   "body_fat": [{"date": "2025-03-10", "value": 21.5}]
//! }
//! ```

use crate::models::{BodyMeasurement, DateRange, MetricKind};
use crate::providers::{MeasurementProvider, ProviderError};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

const PROVIDER_NAME: &str = "health-store";

/// One exported row.
#[derive(Debug, Deserialize)]
struct ExportRow {
    date: String,
    value: f64,
    source: Option<String>,
}

/// Whole export file: one array per metric, either may be absent.
#[derive(Debug, Deserialize, Default)]
struct HealthExport {
    #[serde(default)]
    weight: Vec<ExportRow>,
    #[serde(default)]
    body_fat: Vec<ExportRow>,
}

/// Local health-store provider backed by an export file.
pub struct LocalHealthStore {
    path: PathBuf,
}

impl LocalHealthStore {
    /// Create a provider reading from the given export file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load_export(&self) -> Result<HealthExport, ProviderError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| ProviderError::Config {
            provider: PROVIDER_NAME,
            detail: format!("reading export {}: {e}", self.path.display()),
        })?;
        serde_json::from_str(&raw).map_err(|e| ProviderError::Decode {
            provider: PROVIDER_NAME,
            detail: format!("export {}: {e}", self.path.display()),
        })
    }

    /// Parse-boundary conversion, mirroring the remote adapter: malformed
    /// rows are skipped with a warning so the core only ever sees
    /// well-formed entries.
    fn convert_rows(rows: &[ExportRow], range: &DateRange) -> Vec<BodyMeasurement> {
        rows.iter()
            .filter_map(|row| {
                let day = match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
                    Ok(day) => day,
                    Err(e) => {
                        warn!("skipping export row with unparseable date '{}': {e}", row.date);
                        return None;
                    }
                };
                if day < range.start || day > range.end {
                    return None;
                }
                if !row.value.is_finite() || row.value < 0.0 {
                    warn!(
                        "skipping export row on {} with invalid value {}",
                        row.date, row.value
                    );
                    return None;
                }
                let recorded_at = day.and_hms_opt(0, 0, 0)?.and_utc();
                Some(BodyMeasurement::new(
                    recorded_at,
                    row.value,
                    row.source.clone(),
                ))
            })
            .collect()
    }

    fn fetch(&self, metric: MetricKind, range: &DateRange) -> Result<Vec<BodyMeasurement>, ProviderError> {
        let export = self.load_export()?;
        let rows = match metric {
            MetricKind::Weight => &export.weight,
            MetricKind::BodyFat => &export.body_fat,
        };
        let entries = Self::convert_rows(rows, range);
        debug!("loaded {} local {metric} entries", entries.len());
        Ok(entries)
    }
}

#[async_trait]
impl MeasurementProvider for LocalHealthStore {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn fetch_weight(
        &self,
        range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        self.fetch(MetricKind::Weight, range)
    }

    async fn fetch_body_fat(
        &self,
        range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        self.fetch(MetricKind::BodyFat, range)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    fn row(date: &str, value: f64) -> ExportRow {
        ExportRow {
            date: date.to_owned(),
            value,
            source: None,
        }
    }

    #[test]
    fn rows_outside_range_are_filtered() {
        let rows = vec![
            row("2025-01-01", 80.0),
            row("2025-02-15", 79.0),
            row("2025-04-01", 78.0),
        ];
        let entries =
            LocalHealthStore::convert_rows(&rows, &range((2025, 2, 1), (2025, 2, 28)));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, 79.0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let rows = vec![
            row("2025-02-15", 79.0),
            row("garbage", 80.0),
            row("2025-02-16", f64::INFINITY),
            row("2025-02-17", -3.0),
        ];
        let entries =
            LocalHealthStore::convert_rows(&rows, &range((2025, 2, 1), (2025, 2, 28)));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn source_label_survives_conversion() {
        let rows = vec![ExportRow {
            date: "2025-02-15".to_owned(),
            value: 21.4,
            source: Some("Bathroom Scale".to_owned()),
        }];
        let entries =
            LocalHealthStore::convert_rows(&rows, &range((2025, 2, 1), (2025, 2, 28)));
        assert_eq!(entries[0].source.as_deref(), Some("Bathroom Scale"));
    }

    #[tokio::test]
    async fn missing_export_file_is_a_config_error() {
        let store = LocalHealthStore::new("/nonexistent/bodysync-export.json");
        let err = store
            .fetch_weight(&range((2025, 1, 1), (2025, 12, 31)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Config { .. }));
    }
}
