//! Authorization extractor.
//!
//! `Authorized<P>` runs the gate chain of route profile `P`. Handlers take it
//! before any body extractor, so a rejected request is never parsed and never
//! reaches storage.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::auth::{Claims, RouteProfile};
use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Extractor that requires the request to pass the gates of `P`.
///
/// # Example
///
/// ```rust,ignore
/// async fn list(auth: Authorized<ReadOrders>) -> impl IntoResponse {
///     format!("Hello, {}!", auth.claims.sub)
/// }
/// ```
pub struct Authorized<P: RouteProfile> {
    /// Claims of the validated token.
    pub claims: Claims,
    profile: PhantomData<fn() -> P>,
}

impl<P: RouteProfile> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = bearer_token(&parts.headers);
        let claims = state.pipeline().authorize(bearer, P::GATES).await?;

        set_sentry_user(&claims.sub);

        Ok(Self {
            claims,
            profile: PhantomData,
        })
    }
}

/// Extract the credential from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively. Any other shape yields `None`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
