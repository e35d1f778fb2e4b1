//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in the commerce stack.
//! These prevent accidental identifier confusion — you cannot pass
//! a `CartId` where an `OrderId` is expected.
//!
//! All identifiers serialize transparently as UUIDs, so the wire format
//! is unchanged from a plain `Uuid` field.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a catalog product.
    ProductId,
    "product"
);
id_newtype!(
    /// Unique identifier for a purchasable product variant.
    VariantId,
    "variant"
);
id_newtype!(
    /// Unique identifier for a catalog category.
    CategoryId,
    "category"
);
id_newtype!(
    /// Unique identifier for a supplier.
    SupplierId,
    "supplier"
);
id_newtype!(
    /// Unique identifier for a shopping cart (guest or user-owned).
    CartId,
    "cart"
);
id_newtype!(
    /// Unique identifier for a placed order.
    OrderId,
    "order"
);
id_newtype!(
    /// Unique identifier for a store user.
    UserId,
    "user"
);
id_newtype!(
    /// Unique identifier for a product review.
    ReviewId,
    "review"
);
id_newtype!(
    /// Unique identifier for a recorded payment.
    PaymentId,
    "payment"
);
