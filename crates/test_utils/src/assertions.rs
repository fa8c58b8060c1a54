//! Custom Test Assertions
//!
//! Invariant checks over a snapshot of cars and events, with messages that
//! name the offending record.

use std::collections::HashMap;

use core_kernel::{CarId, Odometer};
use domain_fleet::Car;
use domain_usage::{UsageError, UsageEvent};

/// Asserts every fleet-wide invariant:
///
/// - a car is IN_USE exactly when it has an OPEN event
/// - no car has more than one OPEN event
/// - every CLOSED event has `final_odometer >= odometer`
/// - no CLOSED event's final reading exceeds its car's current odometer
///
/// An OPEN event may start above the car's odometer, which only advances
/// when the event is closed.
pub fn assert_fleet_consistent(cars: &[Car], events: &[UsageEvent]) {
    let mut open_by_car: HashMap<CarId, usize> = HashMap::new();
    for event in events.iter().filter(|e| e.is_open()) {
        *open_by_car.entry(event.car_id).or_default() += 1;
    }

    for car in cars {
        let open = open_by_car.get(&car.id).copied().unwrap_or(0);
        assert!(open <= 1, "car {} has {} open events", car.license_plate, open);
        assert_eq!(
            car.is_in_use(),
            open == 1,
            "car {} is {} with {} open events",
            car.license_plate,
            car.status,
            open
        );
    }

    let odometers: HashMap<CarId, Odometer> = cars.iter().map(|c| (c.id, c.odometer)).collect();
    for event in events {
        assert_closed_event_valid(event);
        let (Some(final_odometer), Some(current)) = (event.final_odometer, odometers.get(&event.car_id))
        else {
            continue;
        };
        assert!(
            final_odometer <= *current,
            "event {} closed at {} but car odometer is only {}",
            event.id,
            final_odometer,
            current
        );
    }
}

/// Asserts a CLOSED event is complete and its readings are ordered
pub fn assert_closed_event_valid(event: &UsageEvent) {
    if !event.is_closed() {
        return;
    }
    let final_odometer = event
        .final_odometer
        .unwrap_or_else(|| panic!("closed event {} has no final odometer", event.id));
    assert!(
        final_odometer >= event.odometer,
        "event {} closed at {} below checkout {}",
        event.id,
        final_odometer,
        event.odometer
    );
    let end_at = event
        .end_at
        .unwrap_or_else(|| panic!("closed event {} has no end time", event.id));
    assert!(end_at >= event.start_at, "event {} ends before it starts", event.id);
}

/// Asserts that a sequence of readings never decreases
pub fn assert_monotonic(readings: &[Odometer]) {
    for pair in readings.windows(2) {
        assert!(
            pair[0] <= pair[1],
            "odometer went backwards from {} to {}",
            pair[0],
            pair[1]
        );
    }
}

/// Asserts that a command was rejected as a precondition failure
pub fn assert_rejected<T: std::fmt::Debug>(result: &Result<T, UsageError>) {
    match result {
        Err(e) => assert!(e.is_precondition_failure(), "expected a rejection, got {:?}", e),
        Ok(value) => panic!("expected a rejection, got {:?}", value),
    }
}
