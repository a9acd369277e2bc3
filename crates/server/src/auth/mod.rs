//! Bearer token authorization.
//!
//! # Flow
//!
//! ```text
//! Authorization: Bearer <jwt>
//!   -> TokenValidator      (signature, iss, aud, exp/nbf)
//!   -> scope gate          (whole-token match in `scope`)
//!   -> IdentityVerifier    (email_verified claim, else Management API lookup
//!                           with a cached service credential)
//!   -> machine grant gate  (gty == client-credentials)
//! ```
//!
//! Which gates run is decided per route by a [`RouteProfile`].

pub mod auth0;
pub mod claims;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod service_token;
pub mod validator;
pub mod verifier;

pub use auth0::Auth0Provider;
pub use claims::{Claims, MACHINE_GRANT_TYPE};
pub use error::{ProviderError, TokenError};
pub use pipeline::{
    AuthorizationPipeline, CreateOrders, Gate, GateFailure, ReadOrders, ReadSummary,
    RouteProfile, scopes,
};
pub use provider::IdentityProvider;
pub use service_token::{ServiceToken, ServiceTokenCache};
pub use validator::TokenValidator;
pub use verifier::{EmailVerification, IdentityVerifier};
