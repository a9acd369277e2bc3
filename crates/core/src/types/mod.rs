//! Core types for Pizza Orders.

pub mod id;
pub mod order;

pub use id::{OrderId, UserId};
pub use order::{LineItem, NewOrder, OrderValidationError};
