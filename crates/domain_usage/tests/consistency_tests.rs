//! Concurrency, compensation and corrupted-storage tests

use std::sync::Arc;

use core_kernel::{CarId, DriverId, ManagerId, Odometer, PortError};
use domain_fleet::{CarDirectory, CarStatus};
use domain_usage::{CreateEvent, EventStatus, UsageError, UsageEvent};
use test_utils::{init_test_tracing, TestFleet};

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_of_one_car() {
        init_test_tracing();
        let fleet = TestFleet::new();
        let car = fleet.add_car(1000).await;
        let first = fleet.add_driver().await;
        let second = fleet.add_driver().await;
        let car_id = car.id;

        let a = {
            let engine = Arc::clone(&fleet.engine);
            let manager_id = fleet.manager_id;
            tokio::spawn(async move {
                engine
                    .create_event(CreateEvent::new(car_id, first.id, manager_id, 1000))
                    .await
            })
        };
        let b = {
            let engine = Arc::clone(&fleet.engine);
            let manager_id = fleet.manager_id;
            tokio::spawn(async move {
                engine
                    .create_event(CreateEvent::new(car_id, second.id, manager_id, 1000))
                    .await
            })
        };

        let results = vec![a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let in_use = results
            .iter()
            .filter(|r| matches!(r, Err(UsageError::CarInUse(id)) if *id == car_id))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(in_use, 1);
        assert_eq!(fleet.all_events().await.len(), 1);
        fleet.assert_consistent().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_checkouts_across_cars() {
        let fleet = TestFleet::new();
        let driver = fleet.add_driver().await;
        let mut cars = Vec::new();
        for _ in 0..8 {
            cars.push(fleet.add_car(0).await);
        }

        let mut handles = Vec::new();
        for car in &cars {
            for _ in 0..4 {
                let engine = Arc::clone(&fleet.engine);
                let command = CreateEvent::new(car.id, driver.id, fleet.manager_id, 10);
                handles.push(tokio::spawn(async move { engine.create_event(command).await }));
            }
        }

        let mut opened = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                opened += 1;
            }
        }

        assert_eq!(opened, cars.len());
        fleet.assert_consistent().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkins_of_one_event() {
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let driver = fleet.add_driver().await;
        let event_id = fleet.checkout(car.id, driver.id, 0).await.unwrap().id;

        let handles: Vec<_> = [40i64, 60]
            .into_iter()
            .map(|reading| {
                let engine = Arc::clone(&fleet.engine);
                tokio::spawn(async move { engine.finalize_event(event_id, reading).await })
            })
            .collect();

        let mut closed = None;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(event) => closed = Some(event),
                Err(UsageError::InvalidEventStatus { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let closed = closed.expect("one check-in succeeds");
        assert_eq!(rejected, 1);
        assert_eq!(Some(fleet.odometer(car.id).await), closed.final_odometer);
        fleet.assert_consistent().await;
    }
}

mod compensation_tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_rolled_back_when_car_update_fails() {
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let driver = fleet.add_driver().await;
        fleet.cars.fail_status_updates(true);

        let result = fleet.checkout(car.id, driver.id, 0).await;

        assert!(matches!(result, Err(UsageError::Port(ref e)) if e.is_transient()));
        assert!(result.unwrap_err().is_retriable());
        assert!(fleet.all_events().await.is_empty());
        assert_eq!(fleet.car(car.id).await.status, CarStatus::Available);
    }

    #[tokio::test]
    async fn test_delete_rolled_back_when_car_update_fails() {
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let driver = fleet.add_driver().await;
        let event = fleet.checkout(car.id, driver.id, 0).await.unwrap();
        fleet.cars.fail_status_updates(true);

        let result = fleet.engine.delete_event(event.id).await;

        assert!(matches!(result, Err(UsageError::Port(PortError::Connection { .. }))));
        assert_eq!(fleet.engine.get_event(event.id).await.unwrap(), event);
        fleet.cars.fail_status_updates(false);
        fleet.assert_consistent().await;
    }

    #[tokio::test]
    async fn test_checkin_rolled_back_when_car_update_fails() {
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let driver = fleet.add_driver().await;
        let event = fleet.checkout(car.id, driver.id, 0).await.unwrap();
        fleet.cars.fail_status_updates(true);

        assert!(fleet.engine.finalize_event(event.id, 25).await.is_err());

        let stored = fleet.engine.get_event(event.id).await.unwrap();
        assert_eq!(stored.status, EventStatus::Open);
        fleet.cars.fail_status_updates(false);
        fleet.assert_consistent().await;

        // The retry succeeds from the same state
        let closed = fleet.engine.finalize_event(event.id, 25).await.unwrap();
        assert_eq!(closed.distance(), Some(25));
    }
}

mod corruption_tests {
    use super::*;

    fn open_event(car_id: CarId, odometer: u64) -> UsageEvent {
        UsageEvent::open(car_id, DriverId::new(), ManagerId::new(), Odometer::new(odometer))
    }

    #[tokio::test]
    async fn test_two_open_events_reported_on_checkout() {
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let driver = fleet.add_driver().await;
        fleet.events.insert_unchecked(open_event(car.id, 0)).await;
        fleet.events.insert_unchecked(open_event(car.id, 0)).await;

        let result = fleet.checkout(car.id, driver.id, 0).await;

        match result {
            Err(e @ UsageError::InvariantViolated(_)) => assert!(!e.is_precondition_failure()),
            other => panic!("expected InvariantViolated, got {:?}", other),
        }
        assert_eq!(fleet.all_events().await.len(), 2);
    }

    #[tokio::test]
    async fn test_two_open_events_reported_on_delete() {
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let event = open_event(car.id, 0);
        fleet.events.insert_unchecked(event.clone()).await;
        fleet.events.insert_unchecked(open_event(car.id, 0)).await;

        let result = fleet.engine.delete_event(event.id).await;
        assert!(matches!(result, Err(UsageError::InvariantViolated(_))));
        assert!(fleet.engine.get_event(event.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_event_for_missing_car_cannot_be_closed() {
        let fleet = TestFleet::new();
        let event = open_event(CarId::new(), 0);
        fleet.events.insert_unchecked(event.clone()).await;

        let result = fleet.engine.finalize_event(event.id, 10).await;
        assert!(matches!(result, Err(UsageError::InvariantViolated(ref m)) if m.contains("missing car")));
    }

    #[tokio::test]
    async fn test_event_for_missing_car_can_be_deleted() {
        let fleet = TestFleet::new();
        let event = open_event(CarId::new(), 0);
        fleet.events.insert_unchecked(event.clone()).await;

        fleet.engine.delete_event(event.id).await.unwrap();
        assert!(fleet.all_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_car_usage_flags_status_drift() {
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let driver = fleet.add_driver().await;

        fleet.checkout(car.id, driver.id, 0).await.unwrap();
        assert!(fleet.engine.car_usage(car.id).await.unwrap().is_consistent());

        // Someone outside the engine flipped the status
        fleet.cars.set_car_status(car.id, CarStatus::Available).await.unwrap();
        let usage = fleet.engine.car_usage(car.id).await.unwrap();
        assert!(!usage.is_consistent());
        assert!(usage.open_event.is_some());
    }
}

mod shared_store_tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use core_kernel::{DomainPort, ReportingPeriod, UsageEventId};
    use domain_usage::{EventLifecycleEngine, EventStore, InMemoryEventStore, OdometerPolicy};

    /// Holds back every closing write, standing in for a slow peer process
    struct DelayedCloses {
        inner: Arc<InMemoryEventStore>,
        delay: Duration,
    }

    impl DomainPort for DelayedCloses {}

    #[async_trait]
    impl EventStore for DelayedCloses {
        async fn create(&self, event: &UsageEvent) -> Result<(), PortError> {
            self.inner.create(event).await
        }

        async fn update(&self, expected: &UsageEvent, replacement: &UsageEvent) -> Result<(), PortError> {
            if replacement.is_closed() {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.update(expected, replacement).await
        }

        async fn find_by_id(&self, id: UsageEventId) -> Result<Option<UsageEvent>, PortError> {
            self.inner.find_by_id(id).await
        }

        async fn find_all(&self) -> Result<Vec<UsageEvent>, PortError> {
            self.inner.find_all().await
        }

        async fn find_open_event_for_car(&self, car_id: CarId) -> Result<Option<UsageEvent>, PortError> {
            self.inner.find_open_event_for_car(car_id).await
        }

        async fn find_open_events_for_driver(
            &self,
            driver_id: DriverId,
        ) -> Result<Vec<UsageEvent>, PortError> {
            self.inner.find_open_events_for_driver(driver_id).await
        }

        async fn find_in_period(&self, period: &ReportingPeriod) -> Result<Vec<UsageEvent>, PortError> {
            self.inner.find_in_period(period).await
        }

        async fn delete(&self, id: UsageEventId) -> Result<(), PortError> {
            self.inner.delete(id).await
        }
    }

    /// A second engine over the fleet's directories and store, as another process would run
    fn peer_engine(fleet: &TestFleet, delay: Duration) -> Arc<EventLifecycleEngine> {
        let events = DelayedCloses {
            inner: Arc::clone(&fleet.events),
            delay,
        };
        Arc::new(EventLifecycleEngine::new(
            fleet.cars.clone(),
            fleet.drivers.clone(),
            Arc::new(events),
            OdometerPolicy::default(),
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_engines_racing_to_close_one_event() {
        init_test_tracing();
        let fleet = TestFleet::new();
        let car = fleet.add_car(0).await;
        let driver = fleet.add_driver().await;
        let event_id = fleet.checkout(car.id, driver.id, 0).await.unwrap().id;

        let fast = peer_engine(&fleet, Duration::from_millis(10));
        let slow = peer_engine(&fleet, Duration::from_millis(100));
        let a = tokio::spawn(async move { fast.finalize_event(event_id, 60).await });
        let b = tokio::spawn(async move { slow.finalize_event(event_id, 40).await });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(a.unwrap().final_odometer, Some(Odometer::new(60)));
        assert!(matches!(
            b,
            Err(UsageError::InvalidEventStatus { status: EventStatus::Closed, .. })
        ));

        let stored = fleet.engine.get_event(event_id).await.unwrap();
        assert_eq!(stored.status, EventStatus::Closed);
        assert_eq!(stored.final_odometer, Some(Odometer::new(60)));
        let car = fleet.car(car.id).await;
        assert_eq!(car.status, CarStatus::Available);
        assert_eq!(car.odometer, Odometer::new(60));
        fleet.assert_consistent().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_loses_to_delete_from_other_engine() {
        init_test_tracing();
        let fleet = TestFleet::new();
        let car = fleet.add_car(500).await;
        let driver = fleet.add_driver().await;
        let event_id = fleet.checkout(car.id, driver.id, 500).await.unwrap().id;

        let closer = peer_engine(&fleet, Duration::from_millis(100));
        let deleter = peer_engine(&fleet, Duration::ZERO);
        let close = tokio::spawn(async move { closer.finalize_event(event_id, 550).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        deleter.delete_event(event_id).await.unwrap();

        let result = close.await.unwrap();
        assert!(matches!(result, Err(UsageError::EventNotFound(id)) if id == event_id));

        assert!(fleet.all_events().await.is_empty());
        let car = fleet.car(car.id).await;
        assert_eq!(car.status, CarStatus::Available);
        assert_eq!(car.odometer, Odometer::new(500));
        fleet.assert_consistent().await;
    }
}
