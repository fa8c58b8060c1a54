//! Unit tests for the identifiers module
//!
//! Covers creation, parsing, conversion and display formatting for every
//! fleet identifier type.

use core_kernel::{CarId, DriverId, ManagerId, UsageEventId};
use std::collections::HashSet;
use uuid::Uuid;

mod car_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = CarId::new();
        let id2 = CarId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = CarId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = CarId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = CarId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("CAR-not-a-uuid".parse::<CarId>().is_err());
    }

    #[test]
    fn test_usable_as_hash_key() {
        let mut set = HashSet::new();
        let id = CarId::new();
        set.insert(id);
        set.insert(id);
        assert_eq!(set.len(), 1);
    }
}

mod prefixes {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(CarId::prefix(), "CAR");
        assert_eq!(DriverId::prefix(), "DRV");
        assert_eq!(ManagerId::prefix(), "MGR");
        assert_eq!(UsageEventId::prefix(), "EVT");
    }

    #[test]
    fn test_display_uses_prefix() {
        assert!(DriverId::new().to_string().starts_with("DRV-"));
        assert!(ManagerId::new().to_string().starts_with("MGR-"));
        assert!(UsageEventId::new().to_string().starts_with("EVT-"));
    }
}

mod serialization {
    use super::*;

    #[test]
    fn test_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = UsageEventId::from(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));

        let back: UsageEventId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
