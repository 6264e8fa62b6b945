//! Token storage for the current bearer credential.
//!
//! The store holds exactly one credential slot: read on every outgoing
//! request, replaced on every successful refresh, cleared on logout. Reads
//! and replacements are atomic (the slot is mutex-guarded), so a request
//! never observes a partially-written value.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;

use super::Credential;

/// Token file name in cache directory
const TOKEN_FILE: &str = "token.json";

/// Holds the current credential. Injected into the interceptor so it can be
/// swapped for a test double.
pub trait TokenStore: Send + Sync {
    /// Current credential, if one is stored.
    fn get(&self) -> Option<Credential>;

    /// Replace the stored credential.
    fn set(&self, credential: Credential) -> Result<()>;

    /// Drop the stored credential.
    fn clear(&self) -> Result<()>;
}

/// In-process store with no persistence.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<Credential> {
        self.slot.lock().unwrap().clone()
    }

    fn set(&self, credential: Credential) -> Result<()> {
        *self.slot.lock().unwrap() = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

/// Store persisted as JSON under the cache directory, so a credential
/// survives application restarts until it expires.
pub struct FileTokenStore {
    path: PathBuf,
    slot: Mutex<Option<Credential>>,
}

impl FileTokenStore {
    /// Open the store, loading any previously persisted credential. An
    /// expired credential on disk is discarded rather than loaded.
    pub fn open(cache_dir: PathBuf) -> Result<Self> {
        let path = cache_dir.join(TOKEN_FILE);
        let slot = Self::load_from(&path)?;
        Ok(Self {
            path,
            slot: Mutex::new(slot),
        })
    }

    fn load_from(path: &PathBuf) -> Result<Option<Credential>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents =
            std::fs::read_to_string(path).context("Failed to read token file")?;
        let credential: Credential =
            serde_json::from_str(&contents).context("Failed to parse token file")?;

        if credential.is_expired() {
            debug!("Persisted credential is expired, discarding");
            return Ok(None);
        }
        Ok(Some(credential))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<Credential> {
        self.slot.lock().unwrap().clone()
    }

    fn set(&self, credential: Credential) -> Result<()> {
        let mut slot = self.slot.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&credential)?;
        std::fs::write(&self.path, contents)?;
        *slot = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.slot.lock().unwrap();
        *slot = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
