// ABOUTME: Sync orchestration: concurrent fan-out over four fetches, then stats and reconciliation
// ABOUTME: All-or-nothing failure semantics with typed source/metric error attribution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! The sync engine.
//!
//! `sync_all` fires four independent fetches (remote and local, weight and
//! body fat) concurrently, feeds each metric's pair into the statistics
//! calculator and the reconciler, and returns the combined report. Any
//! fetch failure fails the whole operation: a statistics view built from
//! half the data would silently mislead, so partial results are discarded.

use crate::models::{BodyMeasurement, DateRange, MetricKind};
use crate::providers::{MeasurementProvider, ProviderError};
use crate::reconcile::find_missing;
use crate::stats::{compute_stats, MeasurementStats};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Which collaborator a fetch went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The third-party fitness API.
    Remote,
    /// The on-device health store.
    Local,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remote => "remote",
            Self::Local => "local",
        })
    }
}

/// Typed failure of a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// One of the four fetches failed; identifies which and why.
    #[error("{origin} {metric} fetch failed: {source}")]
    Fetch {
        /// Which source failed.
        origin: SourceKind,
        /// Which metric was being fetched.
        metric: MetricKind,
        /// Underlying provider failure.
        #[source]
        source: ProviderError,
    },
}

impl SyncError {
    /// Whether the failure was the remote rejecting our authorization
    /// (unauthorized/forbidden/bad-request class).
    ///
    /// The caller is expected to treat this as the signal to clear stored
    /// credentials and restart the authentication flow; the engine only
    /// preserves the classification.
    #[must_use]
    pub const fn is_auth_rejected(&self) -> bool {
        match self {
            Self::Fetch { origin, source, .. } => {
                matches!(origin, SourceKind::Remote) && source.is_auth_rejected()
            }
        }
    }
}

/// Everything a completed sync produces.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Summary of remote weight entries.
    pub remote_weight: MeasurementStats,
    /// Summary of local weight entries.
    pub local_weight: MeasurementStats,
    /// Summary of remote body-fat entries.
    pub remote_body_fat: MeasurementStats,
    /// Summary of local body-fat entries.
    pub local_body_fat: MeasurementStats,
    /// Remote weight entries absent locally, most recent first.
    pub missing_weight: Vec<BodyMeasurement>,
    /// Remote body-fat entries absent locally, most recent first.
    pub missing_body_fat: Vec<BodyMeasurement>,
}

impl SyncReport {
    /// Whether both sources agree: nothing is missing locally.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.missing_weight.is_empty() && self.missing_body_fat.is_empty()
    }
}

/// Orchestrates the two source collaborators.
///
/// Holds no mutable state of its own, so concurrent or redundant
/// invocations are safe; an abandoned earlier call cannot corrupt a later
/// one.
pub struct SyncEngine {
    remote: Arc<dyn MeasurementProvider>,
    local: Arc<dyn MeasurementProvider>,
}

impl SyncEngine {
    /// Create an engine over a remote and a local source.
    #[must_use]
    pub fn new(remote: Arc<dyn MeasurementProvider>, local: Arc<dyn MeasurementProvider>) -> Self {
        Self { remote, local }
    }

    async fn fetch(
        &self,
        origin: SourceKind,
        metric: MetricKind,
        range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, SyncError> {
        let provider = match origin {
            SourceKind::Remote => &self.remote,
            SourceKind::Local => &self.local,
        };
        let result = match metric {
            MetricKind::Weight => provider.fetch_weight(range).await,
            MetricKind::BodyFat => provider.fetch_body_fat(range).await,
        };
        result.map_err(|source| SyncError::Fetch {
            origin,
            metric,
            source,
        })
    }

    /// Run one full sync over the given range.
    ///
    /// The four fetches run concurrently with no ordering between them;
    /// statistics and reconciliation run strictly after both members of a
    /// metric's remote/local pair have completed. The first fetch failure
    /// aborts the run and no partial report is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fetch`] naming the source and metric that
    /// failed, with the provider failure as its cause.
    pub async fn sync_all(&self, range: &DateRange) -> Result<SyncReport, SyncError> {
        debug!(
            "starting sync over {} to {} ({} vs {})",
            range.start,
            range.end,
            self.remote.name(),
            self.local.name()
        );

        let (remote_weight, remote_fat, local_weight, local_fat) = tokio::try_join!(
            self.fetch(SourceKind::Remote, MetricKind::Weight, range),
            self.fetch(SourceKind::Remote, MetricKind::BodyFat, range),
            self.fetch(SourceKind::Local, MetricKind::Weight, range),
            self.fetch(SourceKind::Local, MetricKind::BodyFat, range),
        )?;

        let report = SyncReport {
            remote_weight: compute_stats(&remote_weight),
            local_weight: compute_stats(&local_weight),
            remote_body_fat: compute_stats(&remote_fat),
            local_body_fat: compute_stats(&local_fat),
            missing_weight: find_missing(&remote_weight, &local_weight),
            missing_body_fat: find_missing(&remote_fat, &local_fat),
        };

        info!(
            "sync complete: {} weight and {} body fat entries missing locally",
            report.missing_weight.len(),
            report.missing_body_fat.len()
        );
        Ok(report)
    }
}
