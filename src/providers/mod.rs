// ABOUTME: Measurement source abstractions shared by remote and local adapters
// ABOUTME: Defines the MeasurementProvider trait and structured ProviderError type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Source adapters.
//!
//! The sync engine consumes two collaborators polymorphic over the same
//! shape: an async fetch-by-date-range per metric, returning normalized
//! [`BodyMeasurement`] collections. One implementation talks to the Fitbit
//! Web API, the other reads a local health-store export. The engine never
//! learns which is which beyond the [`MeasurementProvider::name`] label.

/// Fitbit Web API adapter (remote source).
pub mod fitbit;
/// Local health-store export adapter (local source).
pub mod local;

use crate::models::{BodyMeasurement, DateRange};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by source adapters.
///
/// Carries enough detail for the caller to distinguish "retry" from
/// "re-authenticate" from "fatal" without inspecting provider internals.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No stored/valid credential before any fetch was attempted.
    #[error("{provider}: authentication required: {reason}")]
    Auth {
        /// Provider name.
        provider: &'static str,
        /// Why authentication failed.
        reason: String,
    },

    /// Non-success HTTP status from the provider API.
    #[error("{provider}: API request failed with status {status_code}: {message}")]
    Api {
        /// Provider name.
        provider: &'static str,
        /// HTTP status code returned.
        status_code: u16,
        /// Response detail, parsed from the provider error body when present.
        message: String,
        /// Whether retrying the same request may succeed.
        retryable: bool,
    },

    /// Network-level failure (includes timeouts).
    #[error("{provider}: request failed: {source}")]
    Network {
        /// Provider name.
        provider: &'static str,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Response body could not be decoded into the expected shape.
    #[error("{provider}: failed to decode response: {detail}")]
    Decode {
        /// Provider name.
        provider: &'static str,
        /// Decode failure detail.
        detail: String,
    },

    /// Adapter misconfiguration (missing client id, unreadable export, ...).
    #[error("{provider}: configuration error: {detail}")]
    Config {
        /// Provider name.
        provider: &'static str,
        /// Configuration failure detail.
        detail: String,
    },

    /// Credential store failure while reading or writing tokens.
    #[error("{provider}: credential store error: {detail}")]
    Store {
        /// Provider name.
        provider: &'static str,
        /// Store failure detail.
        detail: String,
    },
}

impl ProviderError {
    /// Whether the remote rejected our authorization outright.
    ///
    /// Covers the unauthorized/forbidden/bad-request class of HTTP
    /// failures. The caller treats this as the signal to clear stored
    /// credentials and restart the authentication flow; nothing in this
    /// crate clears credentials on its own.
    #[must_use]
    pub const fn is_auth_rejected(&self) -> bool {
        match self {
            Self::Auth { .. } => true,
            Self::Api { status_code, .. } => {
                matches!(status_code, 400 | 401 | 403)
            }
            _ => false,
        }
    }
}

/// A source of dated body measurements.
///
/// Implementations must be `Send + Sync`: the engine fans out fetches
/// across concurrent tasks. Each fetch produces its own immutable
/// collection; adapters hold no state the engine can observe mutating.
#[async_trait]
pub trait MeasurementProvider: Send + Sync {
    /// Source label, recorded as entry provenance and used in errors.
    fn name(&self) -> &'static str;

    /// Fetch body-weight entries (kilograms) within the range, inclusive.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the source cannot be reached,
    /// rejects the request, or produces an undecodable response.
    async fn fetch_weight(&self, range: &DateRange)
        -> Result<Vec<BodyMeasurement>, ProviderError>;

    /// Fetch body-fat entries (percentage points) within the range, inclusive.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the source cannot be reached,
    /// rejects the request, or produces an undecodable response.
    async fn fetch_body_fat(
        &self,
        range: &DateRange,
    ) -> Result<Vec<BodyMeasurement>, ProviderError>;
}
