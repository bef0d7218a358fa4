// ABOUTME: Structured logging setup built on tracing-subscriber
// ABOUTME: Level from RUST_LOG, output format selectable via LOG_FORMAT
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Logging configuration.

use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for machine-read logs.
    Json,
    /// Pretty format for development.
    Pretty,
    /// Compact format for space-constrained environments.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (`RUST_LOG` syntax).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Build from `RUST_LOG` and `LOG_FORMAT` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };
        Self { level, format }
    }

    /// Install the global tracing subscriber.
    ///
    /// # Errors
    ///
    /// Fails when the level filter cannot be parsed or a subscriber is
    /// already installed.
    pub fn init(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.level)?;
        let registry = tracing_subscriber::registry().with(filter);

        match self.format {
            LogFormat::Json => {
                let json_layer = fmt::layer().with_target(true).json();
                registry.with(json_layer).try_init()?;
            }
            LogFormat::Pretty => {
                let pretty_layer = fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true);
                registry.with(pretty_layer).try_init()?;
            }
            LogFormat::Compact => {
                let compact_layer = fmt::layer()
                    .compact()
                    .with_file(false)
                    .with_line_number(false)
                    .with_target(false);
                registry.with(compact_layer).try_init()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_pretty_info() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
