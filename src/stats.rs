// ABOUTME: Pure statistics over measurement collections: first, last, average
// ABOUTME: No side effects and no error paths, including on empty input
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Summary statistics for a measurement stream.

use crate::models::BodyMeasurement;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single value/timestamp pair picked out of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatPoint {
    /// Measurement value at this point.
    pub value: f64,
    /// When the measurement was taken.
    pub recorded_at: DateTime<Utc>,
}

/// Derived summary of a measurement collection. Never persisted.
///
/// All three fields are present exactly when the input was non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeasurementStats {
    /// Entry with the minimum timestamp.
    pub first: Option<StatPoint>,
    /// Entry with the maximum timestamp.
    pub last: Option<StatPoint>,
    /// Unweighted arithmetic mean of all values; duplicate-day collisions
    /// count individually.
    pub average: Option<f64>,
}

impl MeasurementStats {
    /// Whether the summary came from an empty collection.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first.is_none()
    }
}

/// Compute first/last/average over a measurement collection.
///
/// Input may be empty, unsorted, and may hold several entries on the same
/// calendar day. Order of operations is fixed: the first/last picks come
/// from a stable ascending sort by timestamp (ties keep input order, since
/// sources guarantee no secondary key), while the average is summed over
/// the original input order so it is independent of the sort.
#[must_use]
pub fn compute_stats(entries: &[BodyMeasurement]) -> MeasurementStats {
    if entries.is_empty() {
        return MeasurementStats::default();
    }

    let sum: f64 = entries.iter().map(|e| e.value).sum();
    let average = sum / entries.len() as f64;

    let mut ordered: Vec<&BodyMeasurement> = entries.iter().collect();
    ordered.sort_by_key(|e| e.recorded_at);

    let first = ordered[0];
    let last = ordered[ordered.len() - 1];

    MeasurementStats {
        first: Some(StatPoint {
            value: first.value,
            recorded_at: first.recorded_at,
        }),
        last: Some(StatPoint {
            value: last.value,
            recorded_at: last.recorded_at,
        }),
        average: Some(average),
    }
}
