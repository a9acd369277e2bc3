//! Newtype ids for type-safe entity references.
//!
//! Both ids wrap the `SERIAL` primary keys of their tables. Keeping them as
//! distinct types stops a `UserId` from being passed where an `OrderId` is
//! expected.

use serde::{Deserialize, Serialize};

/// Define an `i32`-backed id newtype.
///
/// With the `postgres` feature the id is a transparent `sqlx` type, so it can
/// be bound and decoded directly.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database id.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Internal surrogate key of a user row.
    UserId
);
entity_id!(
    /// Key of an order row.
    OrderId
);
