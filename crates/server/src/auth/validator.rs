//! Bearer token validation against the issuer's published key set.
//!
//! Keys are fetched from `{issuer}/.well-known/jwks.json` and cached per key id.
//! A token signed with an unknown key id triggers a refresh of the whole set,
//! at most once per [`MIN_REFRESH_INTERVAL`], so a flood of forged key ids
//! cannot turn into a flood of requests to the issuer.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::instrument;

use super::claims::Claims;
use super::error::TokenError;

/// How long a fetched key stays cached.
const KEY_TTL: Duration = Duration::from_secs(600);

/// Minimum time between two key-set refreshes.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
const LEEWAY_SECS: u64 = 30;

/// Validates access tokens and extracts their [`Claims`].
pub struct TokenValidator {
    keys: KeySource,
    validation: Validation,
    issuer: String,
    claims_namespace: Option<String>,
}

enum KeySource {
    Remote(RemoteKeys),
    Static(HashMap<String, DecodingKey>),
}

struct RemoteKeys {
    client: reqwest::Client,
    jwks_url: String,
    cache: Cache<String, DecodingKey>,
    last_refresh: Mutex<Option<Refresh>>,
    min_refresh_interval: Duration,
}

/// Outcome of the most recent key-set fetch.
struct Refresh {
    at: Instant,
    failure: Option<String>,
}

impl TokenValidator {
    /// Create a validator that fetches RS256 keys from `jwks_url`.
    #[must_use]
    pub fn remote(client: reqwest::Client, jwks_url: String, issuer: &str, audience: &str) -> Self {
        let keys = KeySource::Remote(RemoteKeys {
            client,
            jwks_url,
            cache: Cache::builder()
                .max_capacity(64)
                .time_to_live(KEY_TTL)
                .build(),
            last_refresh: Mutex::new(None),
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        });

        Self::new(keys, &[Algorithm::RS256], issuer, audience)
    }

    /// Create a validator over a fixed set of keys, indexed by key id.
    #[must_use]
    pub fn with_static_keys<I>(
        keys: I,
        algorithms: &[Algorithm],
        issuer: &str,
        audience: &str,
    ) -> Self
    where
        I: IntoIterator<Item = (String, DecodingKey)>,
    {
        let keys = KeySource::Static(keys.into_iter().collect());
        Self::new(keys, algorithms, issuer, audience)
    }

    fn new(keys: KeySource, algorithms: &[Algorithm], issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = algorithms.to_vec();
        validation.leeway = LEEWAY_SECS;
        validation.validate_nbf = true;
        validation.set_audience(&[audience]);
        // Issuer is compared below with trailing slashes normalized.
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        Self {
            keys,
            validation,
            issuer: normalize_issuer(issuer).to_string(),
            claims_namespace: None,
        }
    }

    #[cfg(test)]
    #[must_use]
    fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        if let KeySource::Remote(remote) = &mut self.keys {
            remote.min_refresh_interval = interval;
        }
        self
    }

    /// Read `email_verified` from `{namespace}email_verified` when the plain
    /// claim is absent.
    #[must_use]
    pub fn with_claims_namespace(mut self, namespace: Option<String>) -> Self {
        self.claims_namespace = namespace;
        self
    }

    /// Validate a raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] naming the failed check, or
    /// [`TokenError::KeySetUnavailable`] if the issuer could not be reached.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::MalformedToken(e.to_string()))?;

        if !self.validation.algorithms.contains(&header.alg) {
            return Err(TokenError::InvalidSignature);
        }

        let kid = header
            .kid
            .ok_or_else(|| TokenError::MalformedToken("missing kid".to_string()))?;

        let key = match &self.keys {
            KeySource::Static(keys) => keys.get(&kid).cloned(),
            KeySource::Remote(remote) => remote.key(&kid).await?,
        }
        .ok_or(TokenError::InvalidSignature)?;

        let mut claims = jsonwebtoken::decode::<Claims>(token, &key, &self.validation)?.claims;

        let issuer = claims.iss.as_deref().map(normalize_issuer);
        if issuer != Some(self.issuer.as_str()) {
            return Err(TokenError::IssuerMismatch);
        }

        if let Some(namespace) = &self.claims_namespace {
            claims.apply_namespace(namespace);
        }

        Ok(claims)
    }
}

impl RemoteKeys {
    /// Look up a key, refreshing the set once if the id is unknown.
    ///
    /// A failed refresh is remembered for the refresh interval, so callers
    /// queued behind it fail at once instead of each waiting out a timeout.
    async fn key(&self, kid: &str) -> Result<Option<DecodingKey>, TokenError> {
        if let Some(key) = self.cache.get(kid).await {
            return Ok(Some(key));
        }

        {
            let mut last_refresh = self.last_refresh.lock().await;

            // Another caller may have refreshed while we waited for the lock.
            if let Some(key) = self.cache.get(kid).await {
                return Ok(Some(key));
            }

            if let Some(refresh) = last_refresh
                .as_ref()
                .filter(|r| r.at.elapsed() < self.min_refresh_interval)
            {
                return match &refresh.failure {
                    Some(reason) => Err(TokenError::KeySetUnavailable(reason.clone())),
                    None => {
                        tracing::debug!(kid, "Unknown key id, refresh throttled");
                        Ok(None)
                    }
                };
            }

            let jwks = match self.fetch().await {
                Ok(jwks) => jwks,
                Err(e) => {
                    tracing::warn!(error = %e, url = %self.jwks_url, "Failed to fetch key set");
                    let reason = e.to_string();
                    *last_refresh = Some(Refresh {
                        at: Instant::now(),
                        failure: Some(reason.clone()),
                    });
                    return Err(TokenError::KeySetUnavailable(reason));
                }
            };

            for (id, key) in decoding_keys(&jwks) {
                self.cache.insert(id, key).await;
            }
            *last_refresh = Some(Refresh {
                at: Instant::now(),
                failure: None,
            });
            tracing::info!(keys = jwks.keys.len(), "Key set refreshed");
        }

        Ok(self.cache.get(kid).await)
    }

    async fn fetch(&self) -> Result<JwkSet, reqwest::Error> {
        self.client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await
    }
}

fn decoding_keys(jwks: &JwkSet) -> impl Iterator<Item = (String, DecodingKey)> + '_ {
    jwks.keys.iter().filter_map(|jwk| {
        let kid = jwk.common.key_id.clone()?;
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => Some((kid, key)),
            Err(e) => {
                tracing::warn!(kid = %kid, error = %e, "Skipping unusable key");
                None
            }
        }
    })
}

fn normalize_issuer(issuer: &str) -> &str {
    issuer.trim_end_matches('/')
}
