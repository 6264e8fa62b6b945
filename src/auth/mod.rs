//! Authentication: credentials, token storage, and session ownership.
//!
//! This module provides:
//! - `Credential`: bearer token with expiry derived from its JWT claims
//! - `TokenStore`: the single slot holding the current credential
//! - `SessionAuthority`: owner of logged-in state and the refresh operation
//! - `PasswordVault`: remembered-login storage, OS keychain in production

pub mod credential;
pub mod credentials;
pub mod session;
pub mod token_store;

pub use credential::{default_renewal_window, Credential};
pub use credentials::{KeyringVault, MemoryVault, PasswordVault};
pub use session::{
    HttpSessionAuthority, RefreshError, SessionAuthority, REFRESH_ROUTE,
};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
