// ABOUTME: bodysync CLI - connects a Fitbit account and syncs body measurements
// ABOUTME: Handles the auth flow, sync runs, and credential lifecycle
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors
//!
//! Usage:
//! ```bash
//! # Connect a Fitbit account (prints the authorization URL, prompts for the code)
//! bodysync auth login
//!
//! # Show whether a credential is stored and when it expires
//! bodysync auth status
//!
//! # Revoke and delete the stored credential
//! bodysync auth logout
//!
//! # Sync the last two years against a local health-store export
//! bodysync sync --local-export export.json
//!
//! # Sync a shorter window
//! bodysync sync --local-export export.json --days 90
//! ```

use anyhow::{bail, Context, Result};
use bodysync::config::FitbitConfig;
use bodysync::logging::LoggingConfig;
use bodysync::models::DateRange;
use bodysync::oauth::{OAuthClient, OAuthError, TokenData, TOKEN_STORE_KEY};
use bodysync::providers::fitbit::FitbitProvider;
use bodysync::providers::local::LocalHealthStore;
use bodysync::stats::MeasurementStats;
use bodysync::sync::SyncEngine;
use bodysync::token_store::{CredentialStore, KeyringStore};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "bodysync",
    about = "Sync body weight and body fat between Fitbit and a local health store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Credential management commands
    Auth {
        #[command(subcommand)]
        action: AuthCommand,
    },

    /// Fetch both sources, print statistics and missing entries
    Sync {
        /// Path to the local health-store export (JSON)
        #[arg(long)]
        local_export: PathBuf,

        /// Days of history to sync (default: two years)
        #[arg(long, default_value = "730")]
        days: i64,
    },
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Run the authorization-code flow and store the resulting credential
    Login,
    /// Show whether a credential is stored and its expiry
    Status,
    /// Revoke (best effort) and delete the stored credential
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging.level = "debug".to_owned();
    }
    logging.init()?;

    let store = Arc::new(KeyringStore::new());

    match cli.command {
        Command::Auth { action } => match action {
            AuthCommand::Login => auth_login(&*store).await,
            AuthCommand::Status => auth_status(&*store),
            AuthCommand::Logout => auth_logout(&*store).await,
        },
        Command::Sync { local_export, days } => run_sync(store, local_export, days).await,
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading from stdin")?;
    Ok(line.trim().to_owned())
}

fn load_token(store: &dyn CredentialStore) -> Result<Option<TokenData>> {
    let Some(raw) = store.get(TOKEN_STORE_KEY)? else {
        return Ok(None);
    };
    let token = serde_json::from_str(&raw).context("stored credential is not valid token JSON")?;
    Ok(Some(token))
}

async fn auth_login(store: &dyn CredentialStore) -> Result<()> {
    let config = FitbitConfig::from_env()?;
    let oauth = OAuthClient::new(config);

    let state = OAuthClient::generate_state();
    println!("Visit this URL and authorize access:\n");
    println!("  {}\n", oauth.authorize_url(&state));

    let code = prompt("Paste the 'code' parameter from the redirect")?;
    let echoed_state = prompt("Paste the 'state' parameter from the redirect")?;
    if echoed_state != state {
        return Err(OAuthError::StateMismatch).context("aborting authorization (possible CSRF)");
    }

    let token = oauth.exchange_code(&code).await?;
    store.set(TOKEN_STORE_KEY, &serde_json::to_string(&token)?)?;

    println!(
        "Fitbit connected. Access token valid until {} (scopes: {}).",
        token.expires_at.format("%Y-%m-%d %H:%M UTC"),
        token.scopes
    );
    Ok(())
}

fn auth_status(store: &dyn CredentialStore) -> Result<()> {
    match load_token(store)? {
        Some(token) => {
            println!(
                "Credential stored; access token {} (expires {}).",
                if token.is_fresh() {
                    "fresh"
                } else {
                    "stale, will refresh on next sync"
                },
                token.expires_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => println!("No credential stored. Run `bodysync auth login`."),
    }
    Ok(())
}

async fn auth_logout(store: &dyn CredentialStore) -> Result<()> {
    if let Some(token) = load_token(store)? {
        let oauth = OAuthClient::new(FitbitConfig::from_env()?);
        if let Err(e) = oauth.revoke_token(&token.access_token).await {
            warn!("token revocation failed, deleting local credential anyway: {e}");
        }
    }
    store.delete(TOKEN_STORE_KEY)?;
    println!("Credential deleted.");
    Ok(())
}

fn print_stats(label: &str, stats: &MeasurementStats) {
    if stats.is_empty() {
        println!("  {label}: no entries");
        return;
    }
    // All three fields are present together once the summary is non-empty.
    if let (Some(first), Some(last), Some(average)) = (stats.first, stats.last, stats.average) {
        println!(
            "  {label}: first {:.1} on {}, last {:.1} on {}, average {average:.1}",
            first.value,
            first.recorded_at.format("%Y-%m-%d"),
            last.value,
            last.recorded_at.format("%Y-%m-%d"),
        );
    }
}

async fn run_sync(store: Arc<KeyringStore>, local_export: PathBuf, days: i64) -> Result<()> {
    if days <= 0 {
        bail!("--days must be positive");
    }
    let config = FitbitConfig::from_env()?;
    let remote = Arc::new(FitbitProvider::new(config, store));
    let local = Arc::new(LocalHealthStore::new(local_export));
    let engine = SyncEngine::new(remote, local);

    let report = match engine.sync_all(&DateRange::last_days(days)).await {
        Ok(report) => report,
        Err(e) if e.is_auth_rejected() => {
            bail!("Fitbit rejected our authorization: {e}\nRun `bodysync auth login` to reconnect.")
        }
        Err(e) => return Err(e.into()),
    };

    println!("Weight (kg):");
    print_stats("fitbit", &report.remote_weight);
    print_stats("health store", &report.local_weight);
    println!("Body fat (%):");
    print_stats("fitbit", &report.remote_body_fat);
    print_stats("health store", &report.local_body_fat);

    if report.is_in_sync() {
        println!("\nLocal store is up to date.");
        return Ok(());
    }

    if !report.missing_weight.is_empty() {
        println!("\nWeight entries missing locally:");
        for entry in &report.missing_weight {
            println!(
                "  {}  {:.1} kg",
                entry.recorded_at.format("%Y-%m-%d"),
                entry.value
            );
        }
    }
    if !report.missing_body_fat.is_empty() {
        println!("\nBody fat entries missing locally:");
        for entry in &report.missing_body_fat {
            println!(
                "  {}  {:.1} %",
                entry.recorded_at.format("%Y-%m-%d"),
                entry.value
            );
        }
    }
    Ok(())
}
