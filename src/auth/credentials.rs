//! Remembered-login storage.
//!
//! A user who opts in to "stay signed in" gets their password stored so the
//! client can log in again after the credential expires, without keeping
//! the password in a file. The vault is injected so tests stay off the OS
//! keychain.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "wayfarer";

/// Storage for the remembered login password, keyed by username.
pub trait PasswordVault: Send + Sync {
    fn store(&self, username: &str, password: &str) -> Result<()>;
    fn get(&self, username: &str) -> Result<String>;
    fn delete(&self, username: &str) -> Result<()>;
}

/// Vault backed by the OS keychain.
pub struct KeyringVault;

impl KeyringVault {
    fn entry(username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, username).context("Failed to create keyring entry")
    }
}

impl PasswordVault for KeyringVault {
    fn store(&self, username: &str, password: &str) -> Result<()> {
        Self::entry(username)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    fn get(&self, username: &str) -> Result<String> {
        Self::entry(username)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    fn delete(&self, username: &str) -> Result<()> {
        Self::entry(username)?
            .delete_credential()
            .context("Failed to delete password from keychain")
    }
}

/// In-process vault with no persistence.
#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordVault for MemoryVault {
    fn store(&self, username: &str, password: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
        Ok(())
    }

    fn get(&self, username: &str) -> Result<String> {
        match self.entries.lock().unwrap().get(username) {
            Some(password) => Ok(password.clone()),
            None => bail!("No stored password for {}", username),
        }
    }

    fn delete(&self, username: &str) -> Result<()> {
        if self.entries.lock().unwrap().remove(username).is_none() {
            bail!("No stored password for {}", username);
        }
        Ok(())
    }
}
