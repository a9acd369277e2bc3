//! Identity provider abstraction.

use async_trait::async_trait;

use super::claims::Claims;
use super::error::{ProviderError, TokenError};
use super::service_token::ServiceToken;

/// Everything the service needs from the identity provider.
///
/// [`Auth0Provider`](super::auth0::Auth0Provider) is the production
/// implementation.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validate an inbound bearer token and return its claims.
    async fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError>;

    /// Look up whether `subject`'s email is verified using the administrative API.
    ///
    /// `Ok(None)` means the profile exists but carries no `email_verified` field.
    async fn fetch_email_verified(
        &self,
        subject: &str,
        credential: &ServiceToken,
    ) -> Result<Option<bool>, ProviderError>;

    /// Obtain a fresh administrative API credential via the client-credentials grant.
    async fn fetch_service_credential(&self) -> Result<ServiceToken, ProviderError>;
}
