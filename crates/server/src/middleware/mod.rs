//! HTTP middleware stack for the order API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, set up hub per request)
//! 2. Request ID (assign id, echo it on every response)
//! 3. `TraceLayer` (request span carrying the request id)
//! 4. CORS (configured browser origins)
//! 5. `Authorized<P>` extractor (per-route gate chain, runs in the handler)

pub mod auth;
pub mod request_id;

pub use auth::Authorized;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
