// ABOUTME: Environment-only configuration for the Fitbit collaborators
// ABOUTME: Endpoint defaults plus client credentials read from env vars
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Configuration.
//!
//! Configuration is environment-only: client credentials come from
//! `FITBIT_CLIENT_ID` / `FITBIT_CLIENT_SECRET`, the redirect URI from
//! `FITBIT_REDIRECT_URI` (defaulting to Fitbit's out-of-band loopback
//! value). Endpoint URLs have fixed defaults and are overridable only in
//! code, which tests use to point at a stub server.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Fitbit Web API base URL (version 1).
pub const FITBIT_API_BASE: &str = "https://api.fitbit.com/1";
/// Fitbit `OAuth2` authorization endpoint.
pub const FITBIT_AUTH_URL: &str = "https://www.fitbit.com/oauth2/authorize";
/// Fitbit `OAuth2` token endpoint.
pub const FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
/// Fitbit `OAuth2` revocation endpoint.
pub const FITBIT_REVOKE_URL: &str = "https://api.fitbit.com/oauth2/revoke";
/// OAuth scopes required for body measurement access.
pub const FITBIT_SCOPES: &str = "weight";

/// Configuration error: a required environment variable is absent.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

/// Endpoints and credentials for the Fitbit collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitbitConfig {
    /// OAuth client ID issued by Fitbit.
    pub client_id: String,
    /// OAuth client secret issued by Fitbit.
    pub client_secret: String,
    /// Redirect URI registered with the Fitbit application.
    pub redirect_uri: String,
    /// OAuth authorization endpoint.
    pub auth_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// OAuth revocation endpoint.
    pub revoke_url: String,
    /// API base URL for data fetches.
    pub api_base_url: String,
    /// Space-separated OAuth scopes to request.
    pub scopes: String,
}

impl FitbitConfig {
    /// Build configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `FITBIT_CLIENT_ID` or
    /// `FITBIT_CLIENT_SECRET` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = env::var("FITBIT_CLIENT_ID")
            .map_err(|_| ConfigError("FITBIT_CLIENT_ID not set".to_owned()))?;
        let client_secret = env::var("FITBIT_CLIENT_SECRET")
            .map_err(|_| ConfigError("FITBIT_CLIENT_SECRET not set".to_owned()))?;
        let redirect_uri = env::var("FITBIT_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080/oauth/callback/fitbit".to_owned());

        Ok(Self::with_credentials(client_id, client_secret, redirect_uri))
    }

    /// Build configuration with explicit credentials and default endpoints.
    #[must_use]
    pub fn with_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_url: FITBIT_AUTH_URL.to_owned(),
            token_url: FITBIT_TOKEN_URL.to_owned(),
            revoke_url: FITBIT_REVOKE_URL.to_owned(),
            api_base_url: FITBIT_API_BASE.to_owned(),
            scopes: FITBIT_SCOPES.to_owned(),
        }
    }
}
