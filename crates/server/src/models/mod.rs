//! Domain models returned by the API.

pub mod order;

pub use order::{Order, OrderSummary};
