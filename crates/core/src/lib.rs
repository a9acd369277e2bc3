//! Pizza Orders Core - Shared domain types.
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. The server and CLI crates build on it.
//!
//! # Modules
//!
//! - [`types`] - Typed ids and the validated order input

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
