// ABOUTME: Crate root for bodysync, body-measurement sync between Fitbit and a local health store
// ABOUTME: Declares the core modules and re-exports the main entry points
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! # bodysync
//!
//! Synchronizes two measurement streams (body weight, body-fat percentage)
//! between the Fitbit Web API and a local health-data store. The core is a
//! reconciliation/statistics engine over a canonical entry model:
//!
//! - [`models`]: the [`models::BodyMeasurement`] entry model
//! - [`stats`]: first/last/average summaries
//! - [`reconcile`]: watermark-based gap detection
//! - [`sync`]: the concurrent fetch orchestrator
//!
//! Everything around the core is a collaborator behind a trait: sources
//! implement [`providers::MeasurementProvider`], credentials live behind
//! [`token_store::CredentialStore`], and OAuth lives in [`oauth`].
//!
//! ```no_run
//! use bodysync::models::DateRange;
//! use bodysync::providers::{fitbit::FitbitProvider, local::LocalHealthStore};
//! use bodysync::sync::SyncEngine;
//! use bodysync::token_store::KeyringStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = bodysync::config::FitbitConfig::from_env()?;
//! let store = Arc::new(KeyringStore::new());
//! let remote = Arc::new(FitbitProvider::new(config, store));
//! let local = Arc::new(LocalHealthStore::new("export.json"));
//!
//! let engine = SyncEngine::new(remote, local);
//! let report = engine.sync_all(&DateRange::all_history()).await?;
//! println!("{} weight entries missing locally", report.missing_weight.len());
//! # Ok(())
//! # }
//! ```

/// Environment-based configuration.
pub mod config;
/// Logging setup.
pub mod logging;
/// Canonical entry model.
pub mod models;
/// `OAuth2` authorization-code collaborator.
pub mod oauth;
/// Source adapters (remote Fitbit, local health store).
pub mod providers;
/// Watermark gap detection.
pub mod reconcile;
/// Summary statistics.
pub mod stats;
/// Concurrent sync orchestration.
pub mod sync;
/// Secure credential storage.
pub mod token_store;

pub use models::{BodyMeasurement, DateRange, MetricKind};
pub use reconcile::find_missing;
pub use stats::{compute_stats, MeasurementStats, StatPoint};
pub use sync::{SyncEngine, SyncError, SyncReport};
