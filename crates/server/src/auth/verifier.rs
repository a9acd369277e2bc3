//! Email verification lookup with a claim fast path.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use super::error::ProviderError;
use super::provider::IdentityProvider;
use super::service_token::ServiceTokenCache;

/// Outcome of resolving a subject's email verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailVerification {
    /// The email is verified.
    Verified,
    /// The email is known to be unverified.
    Unverified,
    /// The status could not be determined.
    Unknown,
}

impl From<bool> for EmailVerification {
    fn from(verified: bool) -> Self {
        if verified {
            Self::Verified
        } else {
            Self::Unverified
        }
    }
}

/// Resolves email verification from the token claim or, failing that, the
/// identity provider's user profile.
pub struct IdentityVerifier {
    provider: Arc<dyn IdentityProvider>,
    tokens: Arc<ServiceTokenCache>,
    timeout: Duration,
}

impl IdentityVerifier {
    /// Create a verifier. `timeout` bounds the whole fallback lookup,
    /// credential refresh included.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        tokens: Arc<ServiceTokenCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            tokens,
            timeout,
        }
    }

    /// Resolve the verification status of `subject`.
    ///
    /// A present `claim` is trusted as is. Fallback failures are logged and
    /// resolve to [`EmailVerification::Unknown`].
    #[instrument(skip(self))]
    pub async fn resolve(&self, subject: &str, claim: Option<bool>) -> EmailVerification {
        if let Some(verified) = claim {
            return verified.into();
        }

        match self.fallback(subject).await {
            Ok(Some(verified)) => verified.into(),
            Ok(None) => {
                tracing::warn!(subject, "User profile has no email_verified field");
                EmailVerification::Unknown
            }
            Err(e) => {
                tracing::warn!(subject, error = %e, "Email verification lookup failed");
                EmailVerification::Unknown
            }
        }
    }

    /// Profile lookup bounded by the verifier timeout.
    async fn fallback(&self, subject: &str) -> Result<Option<bool>, ProviderError> {
        tokio::time::timeout(self.timeout, self.lookup(subject))
            .await
            .unwrap_or_else(|_| Err(ProviderError::Timeout))
    }

    async fn lookup(&self, subject: &str) -> Result<Option<bool>, ProviderError> {
        let credential = self.tokens.get().await?;

        let result = self.provider.fetch_email_verified(subject, &credential).await;
        if matches!(result, Err(ProviderError::Unauthorized)) {
            self.tokens.invalidate().await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ProfileResponse, StubIdentityProvider};

    fn verifier(stub: &Arc<StubIdentityProvider>) -> IdentityVerifier {
        let provider: Arc<dyn IdentityProvider> = stub.clone();
        let tokens = Arc::new(ServiceTokenCache::new(provider.clone()));
        IdentityVerifier::new(provider, tokens, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_claim_fast_path_skips_provider() {
        let stub = Arc::new(StubIdentityProvider::new());
        let verifier = verifier(&stub);

        assert_eq!(
            verifier.resolve("auth0|a", Some(true)).await,
            EmailVerification::Verified
        );
        assert_eq!(
            verifier.resolve("auth0|a", Some(false)).await,
            EmailVerification::Unverified
        );
        assert_eq!(stub.profile_lookups(), 0);
        assert_eq!(stub.credential_fetches(), 0);
    }

    #[tokio::test]
    async fn test_fallback_uses_profile() {
        let stub = Arc::new(StubIdentityProvider::new().with_profile(ProfileResponse::Verified(true)));
        let verifier = verifier(&stub);

        assert_eq!(
            verifier.resolve("auth0|a", None).await,
            EmailVerification::Verified
        );
        assert_eq!(stub.profile_lookups(), 1);

        // The credential is reused for the second lookup.
        verifier.resolve("auth0|b", None).await;
        assert_eq!(stub.credential_fetches(), 1);
    }

    #[tokio::test]
    async fn test_fallback_failures_resolve_to_unknown() {
        for profile in [
            ProfileResponse::MissingField,
            ProfileResponse::NotFound,
            ProfileResponse::Error,
            ProfileResponse::Hang,
        ] {
            let stub = Arc::new(StubIdentityProvider::new().with_profile(profile));
            assert_eq!(
                verifier(&stub).resolve("auth0|a", None).await,
                EmailVerification::Unknown,
                "{profile:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_hanging_lookup_is_a_timeout() {
        let stub = Arc::new(StubIdentityProvider::new().with_profile(ProfileResponse::Hang));
        let verifier = verifier(&stub);

        assert!(matches!(
            verifier.fallback("auth0|a").await,
            Err(ProviderError::Timeout)
        ));
        assert_eq!(stub.profile_lookups(), 1);
    }

    #[tokio::test]
    async fn test_credential_failure_resolves_to_unknown() {
        let stub = Arc::new(
            StubIdentityProvider::new()
                .with_profile(ProfileResponse::Verified(true))
                .with_credential_failure(),
        );

        assert_eq!(
            verifier(&stub).resolve("auth0|a", None).await,
            EmailVerification::Unknown
        );
        assert_eq!(stub.profile_lookups(), 0);
    }

    #[tokio::test]
    async fn test_rejected_credential_is_invalidated() {
        let stub = Arc::new(StubIdentityProvider::new().with_profile(ProfileResponse::Unauthorized));
        let verifier = verifier(&stub);

        assert_eq!(
            verifier.resolve("auth0|a", None).await,
            EmailVerification::Unknown
        );
        verifier.resolve("auth0|a", None).await;

        assert_eq!(stub.credential_fetches(), 2);
    }
}
