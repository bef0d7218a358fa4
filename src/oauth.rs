// ABOUTME: OAuth2 authorization-code collaborator for the Fitbit token endpoints
// ABOUTME: Generates authorize URLs and exchanges, refreshes, and revokes tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! `OAuth2` flow against the Fitbit authorization and token endpoints.
//!
//! The sync core only needs "a function that returns a valid bearer
//! credential or fails"; this module is that collaborator. Redirect
//! handling (browser, loopback listener) stays outside the crate: the CLI
//! pastes the code back in by hand.

use crate::config::FitbitConfig;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Credential-store key under which the Fitbit token is persisted.
pub const TOKEN_STORE_KEY: &str = "fitbit";

/// Bearer credential returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    /// Current access token.
    pub access_token: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
    /// Space-separated granted scopes.
    pub scopes: String,
}

impl TokenData {
    /// Whether the token is still usable, with a five minute buffer so a
    /// fetch started now does not expire mid-flight.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.expires_at > Utc::now() + Duration::minutes(5)
    }
}

/// OAuth flow errors.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Missing or invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Authorization-code exchange failed.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Refresh-grant request failed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// Revocation request failed.
    #[error("token revocation failed: {0}")]
    RevokeFailed(String),

    /// State echoed back by the redirect did not match the one we issued.
    #[error("state parameter mismatch")]
    StateMismatch,
}

/// Wire format of Fitbit token endpoint responses.
#[derive(Debug, Deserialize)]
struct FitbitTokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    scope: String,
}

/// Client for the authorization-code flow.
pub struct OAuthClient {
    config: FitbitConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Create a client for the given configuration.
    #[must_use]
    pub fn new(config: FitbitConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Generate a random state parameter for CSRF protection.
    #[must_use]
    pub fn generate_state() -> String {
        let mut bytes = [0_u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// The URL the user must visit to grant access.
    #[must_use]
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scopes),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::ExchangeFailed`] on transport failure, a
    /// non-success status, or an undecodable response body.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenData, OAuthError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];

        let token = self
            .token_request(&params, OAuthError::ExchangeFailed)
            .await?;
        info!("exchanged authorization code for Fitbit tokens");
        Ok(token)
    }

    /// Obtain a new access token using the refresh grant.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::RefreshFailed`] on transport failure, a
    /// non-success status, or an undecodable response body.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenData, OAuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        let token = self.token_request(&params, OAuthError::RefreshFailed).await?;
        info!("refreshed Fitbit access token");
        Ok(token)
    }

    /// Revoke an access token. Best effort on the provider side; a
    /// non-success status is still reported as an error so the caller can
    /// decide whether to proceed with local credential deletion.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::RevokeFailed`] on transport failure or a
    /// non-success status.
    pub async fn revoke_token(&self, access_token: &str) -> Result<(), OAuthError> {
        let response = self
            .http
            .post(&self.config.revoke_url)
            .header("Authorization", format!("Basic {}", self.basic_auth()))
            .form(&[("token", access_token)])
            .send()
            .await
            .map_err(|e| OAuthError::RevokeFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::RevokeFailed(format!(
                "revocation endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Fitbit requires HTTP Basic auth (client id/secret) on token requests.
    fn basic_auth(&self) -> String {
        BASE64_STANDARD.encode(format!(
            "{}:{}",
            self.config.client_id, self.config.client_secret
        ))
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        wrap: fn(String) -> OAuthError,
    ) -> Result<TokenData, OAuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .header("Authorization", format!("Basic {}", self.basic_auth()))
            .form(params)
            .send()
            .await
            .map_err(|e| wrap(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| wrap(e.to_string()))?;

        if !status.is_success() {
            return Err(wrap(format!("token endpoint returned {status}: {body}")));
        }

        let token: FitbitTokenResponse = serde_json::from_str(&body)
            .map_err(|e| wrap(format!("parse error: {e}")))?;

        Ok(TokenData {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            scopes: token.scope,
        })
    }
}
