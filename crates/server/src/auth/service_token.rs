//! Cached credential for the identity provider's administrative API.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use tokio::sync::RwLock;

use super::error::ProviderError;
use super::provider::IdentityProvider;

/// A credential is treated as expired this many seconds before its actual expiry.
const SAFETY_MARGIN_SECS: i64 = 30;

/// Bearer credential for the administrative API.
#[derive(Debug, Clone)]
pub struct ServiceToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl ServiceToken {
    /// Create a credential valid until `expires_at`.
    #[must_use]
    pub const fn new(value: SecretString, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    /// The bearer value.
    #[must_use]
    pub const fn value(&self) -> &SecretString {
        &self.value
    }

    /// When the provider stops accepting this credential.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the credential is expired or within the safety margin of expiring.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(SAFETY_MARGIN_SECS)
    }
}

/// Process-wide holder of the current [`ServiceToken`].
///
/// Concurrent callers that all see a stale credential each fetch a new one;
/// the last write wins. The lock is never held across the fetch.
pub struct ServiceTokenCache {
    provider: Arc<dyn IdentityProvider>,
    token: RwLock<Option<ServiceToken>>,
}

impl ServiceTokenCache {
    /// Create an empty cache that fetches through `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            token: RwLock::new(None),
        }
    }

    /// Return a currently valid credential, fetching one if needed.
    ///
    /// # Errors
    ///
    /// Returns the provider error if a fetch was needed and failed. Nothing is
    /// cached in that case, so the next caller retries.
    pub async fn get(&self) -> Result<ServiceToken, ProviderError> {
        if let Some(token) = self.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.clone());
        }

        let fresh = self.provider.fetch_service_credential().await?;
        tracing::debug!(expires_at = %fresh.expires_at(), "Service credential refreshed");

        *self.token.write().await = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached credential, e.g. after the provider rejected it.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }
}
