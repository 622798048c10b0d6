//! Marketplace entity identifiers
//!
//! Each identifier is a newtype around UUID v7, so ids sort in creation order
//! and cannot be mixed up across entity kinds.

use nutype::nutype;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[nutype(derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            Display,
            AsRef
        ))]
        pub struct $name(Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self::new(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::generate()
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a user (client or vendor)
    UserId
);
entity_id!(
    /// Unique identifier for a product listing
    ProductId
);
entity_id!(
    /// Unique identifier for a bookable service listing
    ServiceId
);
entity_id!(
    /// Unique identifier for a farm event
    EventId
);
entity_id!(
    /// Unique identifier for an order
    OrderId
);
entity_id!(
    /// Unique identifier for a payment record
    PaymentId
);
entity_id!(
    /// Unique identifier for an event reservation or service booking
    ReservationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let id1 = ProductId::generate();
        let id2 = ProductId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn ids_are_time_ordered() {
        let id1 = OrderId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = OrderId::generate();

        assert!(id2 > id1);
    }

    #[test]
    fn ids_serialize_as_plain_uuids() {
        let id = UserId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));

        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
