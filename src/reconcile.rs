// ABOUTME: Watermark-based gap detection between remote and local measurement streams
// ABOUTME: Flags remote entries strictly newer than the latest known local entry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Reconciliation: which remote entries are missing from the local store.

use crate::models::BodyMeasurement;

/// Find remote entries not yet represented locally.
///
/// Uses a high-watermark cutoff: the timestamp of the most recent local
/// entry. If the local collection is empty, every remote entry is missing.
/// Otherwise only remote entries strictly newer than the watermark are
/// flagged. The result is sorted descending by timestamp (most recent
/// first); entries sharing a timestamp keep their relative order from the
/// input, so identical inputs always yield identically ordered output.
///
/// Local health stores are assumed append-only, with remote history a
/// prefix-compatible superset of local history. Under that assumption the
/// watermark avoids false positives from benign same-day multiple-reading
/// mismatches between sources. The documented limitation: a genuinely
/// absent historical day older than the watermark is never reported. A
/// fuzzy per-day set-difference was considered and rejected.
///
/// Inputs are never mutated; result entries are clones of elements already
/// present in `remote`, never synthesized.
#[must_use]
pub fn find_missing(
    remote: &[BodyMeasurement],
    local: &[BodyMeasurement],
) -> Vec<BodyMeasurement> {
    let watermark = local.iter().map(|e| e.recorded_at).max();

    let mut missing: Vec<BodyMeasurement> = remote
        .iter()
        .filter(|e| watermark.is_none_or(|mark| e.recorded_at > mark))
        .cloned()
        .collect();

    // Stable, so same-timestamp entries retain filter-pass order.
    missing.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    missing
}
