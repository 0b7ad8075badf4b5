use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Fresh random (v4) identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Deterministic identifier, handy for fixtures and reference data.
            pub fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }
    };
}

uuid_id!(
    /// Organizational/geographic grouping owning locations, members and stock.
    ClusterId,
    "cluster"
);
uuid_id!(
    /// Physical storage site within a cluster.
    LocationId,
    "location"
);
uuid_id!(
    /// Catalog book.
    BookId,
    "book"
);
uuid_id!(
    /// Authenticated user, opaque to the core.
    ActorId,
    "actor"
);
uuid_id!(StockRecordId, "stock");
uuid_id!(RequestId, "request");
uuid_id!(FulfillmentId, "fulfillment");
