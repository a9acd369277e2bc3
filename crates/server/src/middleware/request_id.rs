//! Request ID middleware for request tracing and correlation.
//!
//! Uses the `x-request-id` supplied by an upstream proxy when it looks sane,
//! otherwise generates a UUID v4. The middleware sits outside the trace layer
//! and writes the id back onto the request, so the request span, the Sentry
//! scope and the response all carry the same value. Responses produced by
//! inner layers (CORS preflight, fallback) get the header too.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest inbound request id that is accepted as is.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Middleware that ensures every request and response has a request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = inbound_request_id(request.headers()).unwrap_or_else(new_request_id);

    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER, request_id.clone());

    // Set in Sentry scope for error correlation
    if let Ok(id) = request_id.to_str() {
        sentry::configure_scope(|scope| {
            scope.set_tag("request_id", id);
        });
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
    response
}

/// Read the request id from the headers, if present and well-formed.
#[must_use]
pub fn request_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(REQUEST_ID_HEADER)?.to_str().ok()
}

fn inbound_request_id(headers: &HeaderMap) -> Option<HeaderValue> {
    let value = headers.get(REQUEST_ID_HEADER)?;
    let bytes = value.as_bytes();
    let acceptable = !bytes.is_empty()
        && bytes.len() <= MAX_REQUEST_ID_LENGTH
        && bytes.iter().all(u8::is_ascii_graphic);
    acceptable.then(|| value.clone())
}

fn new_request_id() -> HeaderValue {
    let mut buf = Uuid::encode_buffer();
    let id = Uuid::new_v4().hyphenated().encode_lower(&mut buf);
    // A hyphenated UUID is always a valid header value.
    HeaderValue::from_str(id).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}
