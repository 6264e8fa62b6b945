//! Bearer credential with an expiry derived from the token's own claims.
//!
//! Wayfarer API tokens are JWTs; the `exp` claim in the payload segment is
//! the single source of truth for expiry. A token whose payload cannot be
//! decoded is rejected at construction rather than attached blindly.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Buffer time before expiry during which a credential is proactively
/// renewed instead of being used as-is (5 minutes).
pub const DEFAULT_RENEWAL_WINDOW_MINUTES: i64 = 5;

/// Default renewal window as a `chrono::Duration`.
pub fn default_renewal_window() -> Duration {
    Duration::minutes(DEFAULT_RENEWAL_WINDOW_MINUTES)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

impl Credential {
    /// Build a credential from a raw JWT, deriving `expires_at` from the
    /// `exp` claim.
    pub fn from_token(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let expires_at = decode_expiry(&value)?;
        Ok(Self { value, expires_at })
    }

    /// Build a credential with an explicit expiry, for callers that already
    /// know it (deserialized state, tests).
    pub fn with_expiry(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Check if the credential is inside the renewal window and should be
    /// refreshed before being attached to a request.
    pub fn needs_refresh(&self, window: Duration) -> bool {
        self.needs_refresh_at(window, Utc::now())
    }

    pub fn needs_refresh_at(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now > self.expires_at - window
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }
}

fn decode_expiry(token: &str) -> Result<DateTime<Utc>> {
    let payload = token
        .split('.')
        .nth(1)
        .context("Token has no payload segment")?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .context("Token payload is not valid base64url")?;

    let claims: Claims =
        serde_json::from_slice(&bytes).context("Token payload is not valid JSON")?;

    Utc.timestamp_opt(claims.exp, 0)
        .single()
        .context("Token exp claim is out of range")
}
