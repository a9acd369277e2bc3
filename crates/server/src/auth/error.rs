//! Authentication and identity provider error types.

use thiserror::Error;

/// Errors produced while validating an inbound access token.
///
/// Every variant except [`TokenError::KeySetUnavailable`] is an authentication
/// failure and is reported to the client as the same generic 401.
#[derive(Debug, Error)]
pub enum TokenError {
    /// No `Authorization: Bearer` credential on the request.
    #[error("missing bearer token")]
    MissingToken,

    /// The token could not be decoded or lacks a required claim.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Signature does not verify, or no key matches the token's key id.
    #[error("invalid token signature")]
    InvalidSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    TokenExpired,

    /// `nbf` is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// `aud` does not contain the configured audience.
    #[error("audience mismatch")]
    AudienceMismatch,

    /// `iss` is not the configured issuer.
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// The issuer's key set could not be fetched.
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),
}

impl TokenError {
    /// Whether this error means the caller failed to authenticate, as opposed
    /// to the service failing to reach the issuer.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        !matches!(self, Self::KeySetUnavailable(_))
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidAudience => Self::AudienceMismatch,
            ErrorKind::InvalidIssuer => Self::IssuerMismatch,
            _ => Self::MalformedToken(err.to_string()),
        }
    }
}

/// Errors from calls to the identity provider's administrative API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("identity provider returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The provider rejected the service credential.
    #[error("service credential rejected")]
    Unauthorized,

    /// The requested user profile does not exist.
    #[error("user profile not found")]
    NotFound,

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call did not finish within the configured timeout.
    #[error("identity provider timed out")]
    Timeout,

    /// Machine credentials for the administrative API are not configured.
    #[error("administrative API credentials not configured")]
    NotConfigured,
}
