//! Password gate in front of the manager commands.
//!
//! The gate is a convenience lock, not a security boundary: the unlock
//! flag lives on the local machine and the credential comes from the
//! user's own configuration.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// File name of the unlock record inside the state directory.
pub const UNLOCK_FILE_NAME: &str = "manager_unlock.json";

/// Message shown when the submitted password does not match.
pub const WRONG_PASSWORD: &str = "Wrong password. Try again.";

/// Top-level views of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Analyzer,
    Manager,
}

impl View {
    pub fn is_gated(self) -> bool {
        matches!(self, View::Manager)
    }
}

/// Outcome of asking the gate to switch views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The view may be shown immediately.
    Allowed(View),
    /// A password must be submitted before the view is shown.
    PasswordRequired(View),
}

/// Persistence for the unlock flag.
pub trait UnlockStore {
    fn is_unlocked(&self) -> bool;
    fn mark_unlocked(&self) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// Navigation guard holding the configured credential and unlock store.
pub struct ManagerGate<S> {
    credential: Option<String>,
    store: S,
}

impl<S: UnlockStore> ManagerGate<S> {
    pub fn new(credential: Option<String>, store: S) -> Self {
        Self { credential, store }
    }

    pub fn is_unlocked(&self) -> bool {
        self.store.is_unlocked()
    }

    /// Decide whether `view` can be shown right away.
    pub fn navigate(&self, view: View) -> Navigation {
        if !view.is_gated() || self.is_unlocked() {
            Navigation::Allowed(view)
        } else {
            Navigation::PasswordRequired(view)
        }
    }

    /// Check `password` against the credential and persist the unlock.
    ///
    /// Surrounding whitespace in the input is ignored.
    pub fn submit_password(&self, password: &str) -> Result<(), CoreError> {
        let Some(expected) = self.credential.as_deref() else {
            return Err(CoreError::Forbidden(
                "Manager password is not configured".to_string(),
            ));
        };

        if password.trim() != expected {
            tracing::warn!("Manager unlock rejected");
            return Err(CoreError::Unauthorized(WRONG_PASSWORD.to_string()));
        }

        self.store.mark_unlocked()?;
        tracing::info!("Manager unlocked");
        Ok(())
    }

    /// Require an unlocked gate, for commands that skip the prompt.
    pub fn require_unlocked(&self) -> Result<(), CoreError> {
        match self.navigate(View::Manager) {
            Navigation::Allowed(_) => Ok(()),
            Navigation::PasswordRequired(_) => Err(CoreError::Unauthorized(
                "Manager is locked; run `unlock` first".to_string(),
            )),
        }
    }

    pub fn lock(&self) -> Result<(), CoreError> {
        self.store.clear()
    }
}

/* --------------------------------------------------------------------------
Stores
-------------------------------------------------------------------------- */

#[derive(Debug, Serialize, Deserialize)]
struct UnlockRecord {
    unlocked_at: Timestamp,
}

/// Unlock flag persisted as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileUnlockStore {
    path: PathBuf,
}

impl FileUnlockStore {
    /// Store the record as [`UNLOCK_FILE_NAME`] inside `state_dir`.
    pub fn in_dir(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(UNLOCK_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UnlockStore for FileUnlockStore {
    fn is_unlocked(&self) -> bool {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read unlock record");
                return false;
            }
        };

        match serde_json::from_slice::<UnlockRecord>(&raw) {
            Ok(record) => {
                tracing::debug!(unlocked_at = %record.unlocked_at, "Found unlock record");
                true
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring malformed unlock record");
                false
            }
        }
    }

    fn mark_unlocked(&self) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::Internal(format!("Failed to create state dir: {e}")))?;
        }
        let record = UnlockRecord {
            unlocked_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| CoreError::Internal(format!("Failed to encode unlock record: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| CoreError::Internal(format!("Failed to write unlock record: {e}")))
    }

    fn clear(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Internal(format!(
                "Failed to remove unlock record: {e}"
            ))),
        }
    }
}

/// Process-local unlock flag.
#[derive(Debug, Default)]
pub struct MemoryUnlockStore {
    unlocked: AtomicBool,
}

impl UnlockStore for MemoryUnlockStore {
    fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    fn mark_unlocked(&self) -> Result<(), CoreError> {
        self.unlocked.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        self.unlocked.store(false, Ordering::SeqCst);
        Ok(())
    }
}
