// ABOUTME: Tests for the sync engine's concurrent fan-out and all-or-nothing semantics
// ABOUTME: Uses mock providers to exercise success, failure attribution, and auth classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use async_trait::async_trait;
use bodysync::models::{BodyMeasurement, DateRange, MetricKind};
use bodysync::providers::{MeasurementProvider, ProviderError};
use bodysync::sync::{SourceKind, SyncEngine, SyncError};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

fn entry(day: u32, value: f64) -> BodyMeasurement {
    BodyMeasurement::new(
        Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
        value,
        None,
    )
}

fn january() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
    )
}

/// Provider answering every fetch from fixed collections.
struct StaticProvider {
    name: &'static str,
    weight: Vec<BodyMeasurement>,
    body_fat: Vec<BodyMeasurement>,
}

#[async_trait]
impl MeasurementProvider for StaticProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_weight(
        &self,
        _range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        Ok(self.weight.clone())
    }

    async fn fetch_body_fat(
        &self,
        _range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        Ok(self.body_fat.clone())
    }
}

/// Provider that fails one metric with a configurable HTTP status.
struct FailingProvider {
    name: &'static str,
    fail_metric: MetricKind,
    status_code: u16,
    fallback: Vec<BodyMeasurement>,
}

impl FailingProvider {
    fn error(&self) -> ProviderError {
        ProviderError::Api {
            provider: self.name,
            status_code: self.status_code,
            message: "simulated failure".to_owned(),
            retryable: self.status_code >= 500,
        }
    }
}

#[async_trait]
impl MeasurementProvider for FailingProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_weight(
        &self,
        _range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        if self.fail_metric == MetricKind::Weight {
            Err(self.error())
        } else {
            Ok(self.fallback.clone())
        }
    }

    async fn fetch_body_fat(
        &self,
        _range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError> {
        if self.fail_metric == MetricKind::BodyFat {
            Err(self.error())
        } else {
            Ok(self.fallback.clone())
        }
    }
}

#[tokio::test]
async fn successful_sync_bundles_stats_and_missing_entries() {
    let remote = Arc::new(StaticProvider {
        name: "remote",
        weight: vec![entry(1, 80.0), entry(3, 79.0), entry(5, 78.5)],
        body_fat: vec![entry(1, 22.0), entry(5, 21.5)],
    });
    let local = Arc::new(StaticProvider {
        name: "local",
        weight: vec![entry(1, 80.0)],
        body_fat: vec![entry(1, 22.0), entry(5, 21.5)],
    });

    let report = SyncEngine::new(remote, local)
        .sync_all(&january())
        .await
        .unwrap();

    // Remote weight summary over three entries.
    assert_eq!(report.remote_weight.first.unwrap().value, 80.0);
    assert_eq!(report.remote_weight.last.unwrap().value, 78.5);
    let expected_avg = (80.0 + 79.0 + 78.5) / 3.0;
    assert!((report.remote_weight.average.unwrap() - expected_avg).abs() < 1e-9);

    // Local weight has a single entry; local fat matches remote exactly.
    assert_eq!(report.local_weight.first.unwrap().value, 80.0);
    assert!(report.missing_body_fat.is_empty());

    // Weight gap: day5 and day3, most recent first.
    assert_eq!(report.missing_weight.len(), 2);
    assert_eq!(report.missing_weight[0], entry(5, 78.5));
    assert_eq!(report.missing_weight[1], entry(3, 79.0));
    assert!(!report.is_in_sync());
}

#[tokio::test]
async fn fully_synced_sources_report_in_sync() {
    let entries = vec![entry(1, 80.0), entry(2, 79.8)];
    let remote = Arc::new(StaticProvider {
        name: "remote",
        weight: entries.clone(),
        body_fat: vec![],
    });
    let local = Arc::new(StaticProvider {
        name: "local",
        weight: entries,
        body_fat: vec![],
    });

    let report = SyncEngine::new(remote, local)
        .sync_all(&january())
        .await
        .unwrap();

    assert!(report.is_in_sync());
    assert!(report.remote_body_fat.is_empty());
    assert!(report.local_body_fat.is_empty());
}

#[tokio::test]
async fn remote_failure_discards_successful_local_fetches() {
    // Local succeeds for both metrics; the remote weight fetch fails. The
    // whole run must fail with the remote/weight attribution.
    let remote = Arc::new(FailingProvider {
        name: "remote",
        fail_metric: MetricKind::Weight,
        status_code: 502,
        fallback: vec![entry(1, 22.0)],
    });
    let local = Arc::new(StaticProvider {
        name: "local",
        weight: vec![entry(1, 80.0)],
        body_fat: vec![entry(1, 22.0)],
    });

    let err = SyncEngine::new(remote, local)
        .sync_all(&january())
        .await
        .unwrap_err();

    let SyncError::Fetch { origin, metric, .. } = &err;
    assert_eq!(*origin, SourceKind::Remote);
    assert_eq!(*metric, MetricKind::Weight);
    assert!(!err.is_auth_rejected());
}

#[tokio::test]
async fn unauthorized_remote_failure_is_classified_for_reauth() {
    let remote = Arc::new(FailingProvider {
        name: "remote",
        fail_metric: MetricKind::BodyFat,
        status_code: 401,
        fallback: vec![entry(1, 80.0)],
    });
    let local = Arc::new(StaticProvider {
        name: "local",
        weight: vec![],
        body_fat: vec![],
    });

    let err = SyncEngine::new(remote, local)
        .sync_all(&january())
        .await
        .unwrap_err();

    assert!(err.is_auth_rejected());
}

#[tokio::test]
async fn local_failure_is_attributed_to_the_local_source() {
    let remote = Arc::new(StaticProvider {
        name: "remote",
        weight: vec![entry(1, 80.0)],
        body_fat: vec![],
    });
    let local = Arc::new(FailingProvider {
        name: "local",
        fail_metric: MetricKind::Weight,
        status_code: 403,
        fallback: vec![],
    });

    let err = SyncEngine::new(remote, local)
        .sync_all(&january())
        .await
        .unwrap_err();

    let SyncError::Fetch { origin, .. } = &err;
    assert_eq!(*origin, SourceKind::Local);
    // A local 403 is not a remote auth rejection; only the remote source
    // signals re-authentication.
    assert!(!err.is_auth_rejected());
}

#[tokio::test]
async fn engine_is_safe_to_invoke_concurrently() {
    let remote = Arc::new(StaticProvider {
        name: "remote",
        weight: vec![entry(1, 80.0), entry(2, 79.5)],
        body_fat: vec![entry(1, 22.0)],
    });
    let local = Arc::new(StaticProvider {
        name: "local",
        weight: vec![entry(1, 80.0)],
        body_fat: vec![],
    });
    let engine = Arc::new(SyncEngine::new(remote, local));

    let a = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.sync_all(&january()).await }
    });
    let b = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.sync_all(&january()).await }
    });

    let report_a = a.await.unwrap().unwrap();
    let report_b = b.await.unwrap().unwrap();

    assert_eq!(report_a.missing_weight, report_b.missing_weight);
    assert_eq!(report_a.missing_body_fat, report_b.missing_body_fat);
}
