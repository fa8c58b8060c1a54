//! Pre-built Test Fixtures
//!
//! Ready-to-use records with predictable values.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use core_kernel::{ManagerId, Odometer, ReportingPeriod};
use domain_fleet::{Car, Driver};
use uuid::Uuid;

/// Fixture for car records
pub struct CarFixtures;

impl CarFixtures {
    /// An available, active van at 12 000 km
    pub fn van() -> Car {
        Car::new("VAN-001", Odometer::new(12_000))
            .expect("valid fixture plate")
            .with_model("Ford Transit")
    }

    /// A brand-new car at zero
    pub fn new_car() -> Car {
        Car::new("NEW-001", Odometer::ZERO).expect("valid fixture plate")
    }

    /// A car that has been retired from the fleet
    pub fn retired_car() -> Car {
        let mut car = Car::new("OLD-001", Odometer::new(250_000)).expect("valid fixture plate");
        car.is_active = false;
        car
    }
}

/// Fixture for driver records
pub struct DriverFixtures;

impl DriverFixtures {
    pub fn driver() -> Driver {
        Driver::new("Alex Morgan").expect("valid fixture name")
    }

    pub fn second_driver() -> Driver {
        Driver::new("Sam Rivera").expect("valid fixture name")
    }

    pub fn inactive_driver() -> Driver {
        let mut driver = Driver::new("Jordan Lee").expect("valid fixture name");
        driver.set_active(false);
        driver
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// A fixed manager id for deterministic assertions
    pub fn manager_id() -> ManagerId {
        ManagerId::from_uuid(
            Uuid::parse_str("00000000-0000-7000-8000-000000000001").expect("valid fixture uuid"),
        )
    }
}

/// Fixture for reporting periods
pub struct PeriodFixtures;

impl PeriodFixtures {
    /// January 2024, whole days
    pub fn january_2024() -> ReportingPeriod {
        ReportingPeriod::days(
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            NaiveDate::from_ymd_opt(2024, 1, 31).expect("valid date"),
        )
        .expect("valid period")
    }

    /// A timestamp inside [`Self::january_2024`]
    pub fn mid_january_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    /// The last day up to one minute from now, covering events created by the test
    pub fn around_now() -> ReportingPeriod {
        ReportingPeriod::trailing(Utc::now() + Duration::minutes(1), Duration::days(1))
            .expect("valid period")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_january_contains_mid_january() {
        assert!(PeriodFixtures::january_2024().contains(PeriodFixtures::mid_january_2024()));
    }

    #[test]
    fn test_retired_car_is_inactive() {
        assert!(!CarFixtures::retired_car().is_active);
        assert!(CarFixtures::van().is_available());
    }
}
