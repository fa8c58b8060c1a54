//! Property-Based Test Generators
//!
//! Proptest strategies for fleet records and for random sequences of engine
//! commands.

use proptest::prelude::*;

use core_kernel::Odometer;

/// Strategy for odometer readings a real car could show
pub fn odometer_strategy() -> impl Strategy<Value = Odometer> {
    (0u64..1_000_000u64).prop_map(Odometer::new)
}

/// Strategy for plates `normalize_license_plate` accepts
pub fn license_plate_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{2,3}-[0-9]{1,4}"
}

/// Strategy for non-empty driver names
pub fn driver_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,10} [A-Z][a-z]{1,12}"
}

/// One step of a generated engine session
///
/// Indices are reduced modulo the number of cars, drivers or created events
/// when the step is applied, so any generated value is usable.
#[derive(Debug, Clone)]
pub enum UsageCommand {
    /// Check a car out at `car odometer + offset`; offset may be negative
    Create {
        car: usize,
        driver: usize,
        offset: i64,
    },
    /// Check the n-th created event in at `checkout reading + offset`
    Finalize { event: usize, offset: i64 },
    /// Cancel the n-th created event
    Delete { event: usize },
}

/// Offsets mostly in the accepted range, with rollbacks and implausible jumps mixed in
pub fn reading_offset_strategy(max_delta: u64) -> impl Strategy<Value = i64> {
    let max = max_delta as i64;
    prop_oneof![
        6 => 0..=max,
        1 => -500i64..0,
        1 => (max + 1)..(max * 3 + 2),
    ]
}

/// Strategy for a single command against `cars` cars and `drivers` drivers
pub fn usage_command_strategy(
    cars: usize,
    drivers: usize,
    max_delta: u64,
) -> impl Strategy<Value = UsageCommand> {
    prop_oneof![
        4 => (0..cars, 0..drivers, reading_offset_strategy(max_delta))
            .prop_map(|(car, driver, offset)| UsageCommand::Create { car, driver, offset }),
        3 => (any::<usize>(), reading_offset_strategy(max_delta))
            .prop_map(|(event, offset)| UsageCommand::Finalize { event, offset }),
        1 => any::<usize>().prop_map(|event| UsageCommand::Delete { event }),
    ]
}

/// Strategy for a session of up to `max_len` commands
pub fn usage_session_strategy(
    cars: usize,
    drivers: usize,
    max_delta: u64,
    max_len: usize,
) -> impl Strategy<Value = Vec<UsageCommand>> {
    prop::collection::vec(usage_command_strategy(cars, drivers, max_delta), 1..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_fleet::normalize_license_plate;

    proptest! {
        #[test]
        fn generated_plates_are_valid(plate in license_plate_strategy()) {
            prop_assert_eq!(normalize_license_plate(&plate).unwrap(), plate);
        }

        #[test]
        fn offsets_stay_in_generated_bands(offset in reading_offset_strategy(100)) {
            prop_assert!((-500..=302).contains(&offset));
        }
    }
}
