//! Per-route authorization gates.
//!
//! Each protected route names a [`RouteProfile`] whose `GATES` run in order.
//! The first failing gate ends evaluation; nothing after it runs.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use super::claims::Claims;
use super::error::TokenError;
use super::provider::IdentityProvider;
use super::verifier::{EmailVerification, IdentityVerifier};

/// Permission names checked by the scope gates.
pub mod scopes {
    /// Place orders.
    pub const CREATE_ORDERS: &str = "create:orders";
    /// Read one's own orders.
    pub const READ_ORDERS: &str = "read:orders";
    /// Read any user's order summary (machine callers).
    pub const READ_ORDERS_SUMMARY: &str = "read:orders_summary";
}

/// One step of the authorization chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Validate the bearer token.
    Authenticate,
    /// Require a permission in `scope`.
    Scope(&'static str),
    /// Require a verified email.
    VerifiedEmail,
    /// Require a client-credentials token.
    MachineGrant,
}

/// Why a request was stopped by a gate.
#[derive(Debug, Error)]
pub enum GateFailure {
    /// Token missing, invalid, or the key set could not be fetched.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Required permission absent.
    #[error("insufficient scope: {0} required")]
    InsufficientScope(&'static str),
    /// Email is known to be unverified.
    #[error("email not verified")]
    EmailNotVerified,
    /// Email status could not be determined.
    #[error("email verification status unavailable")]
    EmailVerificationUnavailable,
    /// Route is for machine-to-machine callers only.
    #[error("machine-to-machine token required")]
    MachineGrantRequired,
}

/// Gate chain of a protected route.
pub trait RouteProfile: Send + Sync + 'static {
    /// Gates in evaluation order.
    const GATES: &'static [Gate];
}

/// `POST /orders`
pub struct CreateOrders;

impl RouteProfile for CreateOrders {
    const GATES: &'static [Gate] = &[
        Gate::Authenticate,
        Gate::Scope(scopes::CREATE_ORDERS),
        Gate::VerifiedEmail,
    ];
}

/// `GET /orders`
pub struct ReadOrders;

impl RouteProfile for ReadOrders {
    const GATES: &'static [Gate] = &[Gate::Authenticate, Gate::Scope(scopes::READ_ORDERS)];
}

/// `GET /orders/summary`
pub struct ReadSummary;

impl RouteProfile for ReadSummary {
    const GATES: &'static [Gate] = &[
        Gate::Authenticate,
        Gate::Scope(scopes::READ_ORDERS_SUMMARY),
        Gate::MachineGrant,
    ];
}

/// Runs gate chains against inbound bearer tokens.
pub struct AuthorizationPipeline {
    provider: Arc<dyn IdentityProvider>,
    verifier: IdentityVerifier,
}

impl AuthorizationPipeline {
    /// Create a pipeline from its collaborators.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, verifier: IdentityVerifier) -> Self {
        Self { provider, verifier }
    }

    /// Evaluate `gates` in order for the given bearer token.
    ///
    /// # Errors
    ///
    /// Returns the [`GateFailure`] of the first gate that does not pass. A chain
    /// without [`Gate::Authenticate`] before its other gates fails with
    /// [`TokenError::MissingToken`].
    #[instrument(skip_all, fields(subject))]
    pub async fn authorize(
        &self,
        bearer: Option<&str>,
        gates: &[Gate],
    ) -> Result<Claims, GateFailure> {
        let mut claims: Option<Claims> = None;

        for &gate in gates {
            match gate {
                Gate::Authenticate => {
                    let token = bearer.ok_or(TokenError::MissingToken)?;
                    let validated = self.provider.verify_access_token(token).await?;
                    tracing::Span::current().record("subject", validated.sub.as_str());
                    claims = Some(validated);
                }
                Gate::Scope(required) => {
                    if !authenticated(claims.as_ref())?.has_scope(required) {
                        return Err(GateFailure::InsufficientScope(required));
                    }
                }
                Gate::VerifiedEmail => {
                    let current = authenticated(claims.as_ref())?;
                    match self
                        .verifier
                        .resolve(&current.sub, current.email_verified)
                        .await
                    {
                        EmailVerification::Verified => {}
                        EmailVerification::Unverified => {
                            return Err(GateFailure::EmailNotVerified);
                        }
                        EmailVerification::Unknown => {
                            return Err(GateFailure::EmailVerificationUnavailable);
                        }
                    }
                }
                Gate::MachineGrant => {
                    if !authenticated(claims.as_ref())?.is_machine() {
                        return Err(GateFailure::MachineGrantRequired);
                    }
                }
            }
        }

        claims.ok_or(GateFailure::Token(TokenError::MissingToken))
    }
}

fn authenticated(claims: Option<&Claims>) -> Result<&Claims, GateFailure> {
    claims.ok_or(GateFailure::Token(TokenError::MissingToken))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::ServiceTokenCache;
    use crate::testutil::{ProfileResponse, StubIdentityProvider, TokenBuilder};

    fn pipeline(stub: &Arc<StubIdentityProvider>) -> AuthorizationPipeline {
        let provider: Arc<dyn IdentityProvider> = stub.clone();
        let tokens = Arc::new(ServiceTokenCache::new(provider.clone()));
        let verifier = IdentityVerifier::new(provider.clone(), tokens, Duration::from_millis(200));
        AuthorizationPipeline::new(provider, verifier)
    }

    #[tokio::test]
    async fn test_missing_token_fails_first_gate() {
        let stub = Arc::new(StubIdentityProvider::new());
        let result = pipeline(&stub).authorize(None, ReadOrders::GATES).await;
        assert!(matches!(
            result,
            Err(GateFailure::Token(TokenError::MissingToken))
        ));
    }

    #[tokio::test]
    async fn test_scope_failure_short_circuits_email_check() {
        let stub = Arc::new(StubIdentityProvider::new().with_profile(ProfileResponse::Verified(true)));
        let token = TokenBuilder::user("auth0|a").scope("read:orders").build();

        let result = pipeline(&stub)
            .authorize(Some(&token), CreateOrders::GATES)
            .await;

        assert!(matches!(
            result,
            Err(GateFailure::InsufficientScope(scopes::CREATE_ORDERS))
        ));
        assert_eq!(stub.profile_lookups(), 0);
    }

    #[tokio::test]
    async fn test_create_orders_email_outcomes() {
        let stub = Arc::new(StubIdentityProvider::new().with_profile(ProfileResponse::Error));
        let pipeline = pipeline(&stub);

        let verified = TokenBuilder::user("auth0|a")
            .scope("create:orders")
            .email_verified(true)
            .build();
        let claims = pipeline
            .authorize(Some(&verified), CreateOrders::GATES)
            .await
            .unwrap();
        assert_eq!(claims.sub, "auth0|a");

        let unverified = TokenBuilder::user("auth0|a")
            .scope("create:orders")
            .email_verified(false)
            .build();
        assert!(matches!(
            pipeline.authorize(Some(&unverified), CreateOrders::GATES).await,
            Err(GateFailure::EmailNotVerified)
        ));

        let no_claim = TokenBuilder::user("auth0|a").scope("create:orders").build();
        assert!(matches!(
            pipeline.authorize(Some(&no_claim), CreateOrders::GATES).await,
            Err(GateFailure::EmailVerificationUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_summary_requires_machine_grant() {
        let stub = Arc::new(StubIdentityProvider::new());
        let pipeline = pipeline(&stub);

        let human = TokenBuilder::user("auth0|a")
            .scope("read:orders_summary")
            .build();
        assert!(matches!(
            pipeline.authorize(Some(&human), ReadSummary::GATES).await,
            Err(GateFailure::MachineGrantRequired)
        ));

        let machine = TokenBuilder::machine("hook@clients")
            .scope("read:orders_summary")
            .build();
        assert!(
            pipeline
                .authorize(Some(&machine), ReadSummary::GATES)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_chain_without_authentication_is_rejected() {
        let stub = Arc::new(StubIdentityProvider::new());
        let token = TokenBuilder::user("auth0|a").scope("read:orders").build();

        let result = pipeline(&stub)
            .authorize(Some(&token), &[Gate::Scope(scopes::READ_ORDERS)])
            .await;
        assert!(matches!(
            result,
            Err(GateFailure::Token(TokenError::MissingToken))
        ));
    }
}
