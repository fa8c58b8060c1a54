//! PostgreSQL adapter tests
//!
//! These start a container and are ignored by default; run them with
//! `cargo test -p infra_db -- --ignored`.

use std::sync::Arc;

use chrono::{Duration, Utc};

use core_kernel::{ManagerId, Odometer, PortError, ReportingPeriod};
use domain_fleet::{CarDirectory, CarStatus, DriverDirectory};
use domain_usage::{CreateEvent, EventLifecycleEngine, EventStore, OdometerPolicy, UsageError, UsageEvent};
use test_utils::{db_test, CarBuilder, DriverBuilder, TestDatabase};

async fn seed(db: &TestDatabase) -> (domain_fleet::Car, domain_fleet::Driver) {
    let car = CarBuilder::new().with_odometer(1_000).build();
    let driver = DriverBuilder::new().build();
    db.car_directory().register(&car).await.unwrap();
    db.driver_directory().register(&driver).await.unwrap();
    (car, driver)
}

db_test!(test_unique_index_rejects_second_open_event, |db| {
    let (car, driver) = seed(&db).await;
    let store = db.event_store();

    let first = UsageEvent::open(car.id, driver.id, ManagerId::new(), Odometer::new(1_000));
    let second = UsageEvent::open(car.id, driver.id, ManagerId::new(), Odometer::new(1_000));
    store.create(&first).await.unwrap();

    let result = store.create(&second).await;
    assert!(matches!(result, Err(PortError::Conflict { .. })));
    assert_eq!(store.find_open_event_for_car(car.id).await.unwrap(), Some(first));
});

db_test!(test_event_round_trip_and_delete, |db| {
    let (car, driver) = seed(&db).await;
    let store = db.event_store();

    let checkout = UsageEvent::open(car.id, driver.id, ManagerId::new(), Odometer::new(1_000));
    store.create(&checkout).await.unwrap();
    let checkout = store.find_by_id(checkout.id).await.unwrap().unwrap();
    let mut closed = checkout.clone();
    closed.close(Odometer::new(1_090)).unwrap();
    store.update(&checkout, &closed).await.unwrap();

    let stored = store.find_by_id(checkout.id).await.unwrap().unwrap();
    assert!(stored.is_closed());
    assert_eq!(stored.distance(), Some(90));
    assert!(store.delete(checkout.id).await.unwrap_err().is_conflict());

    let open = UsageEvent::open(car.id, driver.id, ManagerId::new(), Odometer::new(1_090));
    store.create(&open).await.unwrap();
    store.delete(open.id).await.unwrap();
    assert!(store.find_by_id(open.id).await.unwrap().is_none());
    assert!(store.delete(open.id).await.unwrap_err().is_not_found());
});

db_test!(test_update_from_stale_copy_conflicts, |db| {
    let (car, driver) = seed(&db).await;
    let store = db.event_store();

    let checkout = UsageEvent::open(car.id, driver.id, ManagerId::new(), Odometer::new(1_000));
    store.create(&checkout).await.unwrap();
    let checkout = store.find_by_id(checkout.id).await.unwrap().unwrap();

    let mut first = checkout.clone();
    first.close(Odometer::new(1_060)).unwrap();
    let mut second = checkout.clone();
    second.close(Odometer::new(1_040)).unwrap();

    store.update(&checkout, &first).await.unwrap();
    let result = store.update(&checkout, &second).await;
    assert!(matches!(result, Err(PortError::Conflict { .. })));

    let stored = store.find_by_id(checkout.id).await.unwrap().unwrap();
    assert_eq!(stored.final_odometer, Some(Odometer::new(1_060)));
});

db_test!(test_find_in_period, |db| {
    let (car, driver) = seed(&db).await;
    let store = db.event_store();
    store
        .create(&UsageEvent::open(car.id, driver.id, ManagerId::new(), Odometer::new(1_000)))
        .await
        .unwrap();

    let now = Utc::now();
    let current = ReportingPeriod::trailing(now + Duration::minutes(5), Duration::hours(1)).unwrap();
    let past = ReportingPeriod::bounded(now - Duration::days(2), now - Duration::days(1)).unwrap();

    assert_eq!(store.find_in_period(&current).await.unwrap().len(), 1);
    assert!(store.find_in_period(&past).await.unwrap().is_empty());
    assert_eq!(store.find_open_events_for_driver(driver.id).await.unwrap().len(), 1);
});

db_test!(test_car_directory_updates, |db| {
    let (car, driver) = seed(&db).await;
    let cars = db.car_directory();

    let found = cars.find_by_license_plate(&car.license_plate.to_lowercase()).await.unwrap();
    assert_eq!(found.map(|c| c.id), Some(car.id));

    cars.set_car_status(car.id, CarStatus::InUse).await.unwrap();
    cars.set_car_odometer(car.id, Odometer::new(1_500)).await.unwrap();
    let rollback = cars.set_car_odometer(car.id, Odometer::new(1_499)).await;
    assert!(matches!(rollback, Err(PortError::Validation { .. })));

    let stored = cars.get_car(car.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CarStatus::InUse);
    assert_eq!(stored.odometer, Odometer::new(1_500));

    let drivers = db.driver_directory();
    drivers.set_active(driver.id, false).await.unwrap();
    assert!(!drivers.get_driver(driver.id).await.unwrap().unwrap().is_active);
});

db_test!(test_engine_on_postgres, |db| {
    let (car, driver) = seed(&db).await;
    let cars = Arc::new(db.car_directory());
    let engine = EventLifecycleEngine::new(
        cars.clone(),
        Arc::new(db.driver_directory()),
        Arc::new(db.event_store()),
        OdometerPolicy::default(),
    );

    let event = engine
        .create_event(CreateEvent::new(car.id, driver.id, ManagerId::new(), 1_000))
        .await
        .unwrap();
    assert!(matches!(
        engine
            .create_event(CreateEvent::new(car.id, driver.id, ManagerId::new(), 1_000))
            .await,
        Err(UsageError::CarInUse(_))
    ));

    engine.finalize_event(event.id, 1_240).await.unwrap();

    let stored = cars.get_car(car.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CarStatus::Available);
    assert_eq!(stored.odometer, Odometer::new(1_240));
});
