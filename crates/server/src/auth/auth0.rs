//! Auth0 implementation of [`IdentityProvider`].

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::claims::Claims;
use super::error::{ProviderError, TokenError};
use super::provider::IdentityProvider;
use super::service_token::ServiceToken;
use super::validator::TokenValidator;
use crate::config::{IdentityProviderConfig, ManagementCredentials};

/// Identity provider backed by an Auth0 tenant.
///
/// Inbound tokens are checked against the tenant's published key set; the
/// Management API answers email verification lookups.
pub struct Auth0Provider {
    client: reqwest::Client,
    validator: TokenValidator,
    config: IdentityProviderConfig,
}

/// Request body for the client-credentials grant.
#[derive(Serialize)]
struct ClientCredentialsRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

/// The only profile field we read.
#[derive(Deserialize)]
struct UserProfile {
    #[serde(default)]
    email_verified: Option<bool>,
}

impl Auth0Provider {
    /// Create a provider for the configured tenant.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Http` if the HTTP client cannot be built.
    pub fn new(config: IdentityProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;

        let validator = TokenValidator::remote(
            client.clone(),
            config.jwks_url(),
            &config.issuer(),
            &config.audience,
        )
        .with_claims_namespace(config.claims_namespace.clone());

        Ok(Self {
            client,
            validator,
            config,
        })
    }

    fn management(&self) -> Result<&ManagementCredentials, ProviderError> {
        self.config
            .management
            .as_ref()
            .ok_or(ProviderError::NotConfigured)
    }
}

#[async_trait]
impl IdentityProvider for Auth0Provider {
    async fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.validator.validate(token).await
    }

    #[instrument(skip(self, credential))]
    async fn fetch_email_verified(
        &self,
        subject: &str,
        credential: &ServiceToken,
    ) -> Result<Option<bool>, ProviderError> {
        let response = self
            .client
            .get(self.config.user_url(subject))
            .bearer_auth(credential.value().expose_secret())
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let profile: UserProfile = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            Ok(profile.email_verified)
        } else if status == reqwest::StatusCode::UNAUTHORIZED {
            Err(ProviderError::Unauthorized)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(ProviderError::NotFound)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }

    #[instrument(skip(self))]
    async fn fetch_service_credential(&self) -> Result<ServiceToken, ProviderError> {
        let credentials = self.management()?;
        let now = Utc::now();

        let response = self
            .client
            .post(self.config.token_url())
            .json(&ClientCredentialsRequest {
                grant_type: "client_credentials",
                client_id: &credentials.client_id,
                client_secret: credentials.client_secret.expose_secret(),
                audience: &self.config.management_audience,
            })
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::warn!(status = status.as_u16(), "Client-credentials grant failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(ServiceToken::new(
            SecretString::from(token.access_token),
            now + Duration::seconds(token.expires_in),
        ))
    }
}
