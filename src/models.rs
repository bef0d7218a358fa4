// ABOUTME: Canonical measurement entry model shared by all sources and algorithms
// ABOUTME: Defines BodyMeasurement, MetricKind, and the DateRange fetch window
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Entry model for dated body measurements.
//!
//! Every source adapter normalizes its wire format into [`BodyMeasurement`]
//! before anything else touches the data. Entries are immutable value types:
//! equality is field-by-field, and no generated identifier exists that could
//! leak into statistics or reconciliation.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One timestamped numeric measurement.
///
/// `value` is kilograms for [`MetricKind::Weight`] and percentage points
/// (0..=100, already converted from any raw fraction) for
/// [`MetricKind::BodyFat`]. Source adapters guarantee the value is finite
/// and non-negative; the core algorithms never re-validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMeasurement {
    /// When the measurement was taken. Sources report calendar days, so
    /// this is midnight UTC of the reported day.
    pub recorded_at: DateTime<Utc>,
    /// Measurement value in the metric's unit.
    pub value: f64,
    /// Label identifying the originating source (e.g. "fitbit" or a device
    /// name); `None` when unknown.
    pub source: Option<String>,
}

impl BodyMeasurement {
    /// Create a new measurement entry.
    #[must_use]
    pub fn new(recorded_at: DateTime<Utc>, value: f64, source: Option<String>) -> Self {
        Self {
            recorded_at,
            value,
            source,
        }
    }
}

/// The two measurement streams this tool synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Body weight in kilograms.
    Weight,
    /// Body fat in percentage points.
    BodyFat,
}

impl MetricKind {
    /// Short identifier used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::BodyFat => "body_fat",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive date window passed to source adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Start of the window (inclusive).
    pub start: NaiveDate,
    /// End of the window (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range from explicit bounds. `start` must not be after `end`.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "DateRange start after end");
        Self { start, end }
    }

    /// The window ending today and spanning the given number of days back.
    ///
    /// A span reaching past the representable date range is clamped to the
    /// earliest representable day, so even absurdly large values produce a
    /// valid window rather than aborting.
    #[must_use]
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now().date_naive();
        let start = Duration::try_days(days)
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN)
            .min(end);
        Self { start, end }
    }

    /// All relevant history: the last two years.
    #[must_use]
    pub fn all_history() -> Self {
        Self::last_days(730)
    }

    /// Number of calendar days covered, inclusive of both bounds.
    #[must_use]
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    fn entry(y: i32, m: u32, d: u32, h: u32, value: f64) -> BodyMeasurement {
        BodyMeasurement::new(
            Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            value,
            None,
        )
    }

    #[test]
    fn equality_is_by_value() {
        let a = entry(2025, 3, 10, 0, 80.0);
        let b = entry(2025, 3, 10, 0, 80.0);
        assert_eq!(a, b);
    }

    #[test]
    fn last_days_clamps_oversized_windows() {
        let range = DateRange::last_days(100_000_000);
        assert_eq!(range.start, NaiveDate::MIN);
        assert!(range.start <= range.end);
    }

    #[test]
    fn last_days_clamps_unrepresentable_spans() {
        let range = DateRange::last_days(i64::MAX);
        assert_eq!(range.start, NaiveDate::MIN);
        assert!(range.start <= range.end);
    }

    #[test]
    fn date_range_day_count_is_inclusive() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        assert_eq!(range.num_days(), 31);
    }
}
