// ABOUTME: Scoped credential store abstraction with get/set/delete by key
// ABOUTME: KeyringStore uses the OS keychain with a file fallback; MemoryStore backs tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 bodysync contributors

//! Secure credential storage.
//!
//! The sync core never touches credentials directly; it only requires that
//! some [`CredentialStore`] can hand the remote adapter a serialized token.
//! The default implementation writes to the OS keychain and falls back to a
//! file under the user config directory when no keychain is available
//! (headless hosts, CI).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

const DEFAULT_KEYRING_SERVICE: &str = "bodysync";

/// Errors from credential storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Keychain and file fallback both failed to persist the value.
    #[error("failed to store credential '{key}': {detail}")]
    WriteFailed {
        /// Credential key.
        key: String,
        /// Failure detail.
        detail: String,
    },

    /// Stored value could not be removed.
    #[error("failed to delete credential '{key}': {detail}")]
    DeleteFailed {
        /// Credential key.
        key: String,
        /// Failure detail.
        detail: String,
    },

    /// No usable storage location exists on this host.
    #[error("no credential storage location available: {0}")]
    Unavailable(String),
}

/// A scoped key-value credential store.
///
/// Implementable via OS keychain, an encrypted file, or a secrets manager;
/// callers only rely on get/set/delete semantics.
pub trait CredentialStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when no backend can be reached.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteFailed`] when persisting fails.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the value stored under `key`. Removing an absent key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DeleteFailed`] when removal fails.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// OS keychain store with file fallback.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a store scoped to the default service name.
    ///
    /// The service name can be overridden via `BODYSYNC_KEYRING_SERVICE`,
    /// which test runs use to avoid touching real credentials.
    #[must_use]
    pub fn new() -> Self {
        let service = std::env::var("BODYSYNC_KEYRING_SERVICE")
            .unwrap_or_else(|_| DEFAULT_KEYRING_SERVICE.to_owned());
        Self { service }
    }

    /// Create a store scoped to an explicit service name.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn fallback_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let base = dirs::config_dir()
            .ok_or_else(|| StoreError::Unavailable("no user config directory".to_owned()))?;
        Ok(base.join(&self.service).join(format!("credentials-{key}")))
    }

    fn read_fallback(&self, key: &str) -> Option<String> {
        let path = self.fallback_path(key).ok()?;
        let contents = fs::read_to_string(path).ok()?;
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    }

    fn write_fallback(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.fallback_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::WriteFailed {
                key: key.to_owned(),
                detail: format!("creating {}: {e}", parent.display()),
            })?;
        }
        fs::write(&path, value).map_err(|e| StoreError::WriteFailed {
            key: key.to_owned(),
            detail: format!("writing {}: {e}", path.display()),
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).map_err(|e| StoreError::WriteFailed {
                key: key.to_owned(),
                detail: format!("restricting {}: {e}", path.display()),
            })?;
        }
        Ok(())
    }

    fn delete_fallback(&self, key: &str) -> Result<(), StoreError> {
        let path = self.fallback_path(key)?;
        if path.exists() {
            fs::remove_file(&path).map_err(|e| StoreError::DeleteFailed {
                key: key.to_owned(),
                detail: format!("removing {}: {e}", path.display()),
            })?;
        }
        Ok(())
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Ok(entry) = keyring::Entry::new(&self.service, key) {
            if let Ok(value) = entry.get_password() {
                if !value.is_empty() {
                    return Ok(Some(value));
                }
            }
        }
        Ok(self.read_fallback(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match keyring::Entry::new(&self.service, key) {
            Ok(entry) => match entry.set_password(value) {
                Ok(()) => Ok(()),
                Err(error) => {
                    warn!(%error, "keyring write failed; falling back to file");
                    self.write_fallback(key, value)
                }
            },
            Err(error) => {
                warn!(%error, "keyring unavailable; falling back to file");
                self.write_fallback(key, value)
            }
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        // Keychain removal is best effort; the entry may not exist.
        if let Ok(entry) = keyring::Entry::new(&self.service, key) {
            let _ = entry.delete_credential();
        }
        self.delete_fallback(key)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|e| StoreError::WriteFailed {
            key: key.to_owned(),
            detail: e.to_string(),
        })?;
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|e| StoreError::DeleteFailed {
            key: key.to_owned(),
            detail: e.to_string(),
        })?;
        values.remove(key);
        Ok(())
    }
}
