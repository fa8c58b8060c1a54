//! Strongly-typed identifiers for fleet entities
//!
//! Newtype wrappers around UUIDs keep a car id from being passed where a
//! driver id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Fleet directory identifiers
define_id!(CarId, "CAR");
define_id!(DriverId, "DRV");
define_id!(ManagerId, "MGR");

// Usage identifiers
define_id!(UsageEventId, "EVT");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_id_display() {
        let id = CarId::new();
        assert!(id.to_string().starts_with("CAR-"));
    }

    #[test]
    fn test_id_parsing_with_and_without_prefix() {
        let original = UsageEventId::new_v7();
        let parsed: UsageEventId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);

        let bare: UsageEventId = original.as_uuid().to_string().parse().unwrap();
        assert_eq!(original, bare);
    }
}
