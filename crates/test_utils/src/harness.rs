//! In-memory test fleet
//!
//! [`TestFleet`] wires an [`EventLifecycleEngine`] to in-memory directories, an
//! in-memory store and an outbox, and keeps handles to all of them so tests
//! can seed data, inject failures and inspect the results.

use std::sync::Arc;

use core_kernel::{CarId, DriverId, ManagerId, Odometer};
use domain_fleet::{Car, CarDirectory, Driver, InMemoryCarDirectory, InMemoryDriverDirectory};
use domain_usage::{
    CreateEvent, EventLifecycleEngine, EventStore, InMemoryEventStore, InMemoryOutbox,
    OdometerPolicy, UsageError, UsageEvent,
};

use crate::assertions::assert_fleet_consistent;
use crate::builders::{CarBuilder, DriverBuilder};
use crate::fixtures::IdFixtures;

pub struct TestFleet {
    pub engine: Arc<EventLifecycleEngine>,
    pub cars: Arc<InMemoryCarDirectory>,
    pub drivers: Arc<InMemoryDriverDirectory>,
    pub events: Arc<InMemoryEventStore>,
    pub outbox: Arc<InMemoryOutbox>,
    pub manager_id: ManagerId,
}

impl Default for TestFleet {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFleet {
    /// A fleet using the default odometer policy
    pub fn new() -> Self {
        Self::with_policy(OdometerPolicy::default())
    }

    pub fn with_policy(policy: OdometerPolicy) -> Self {
        let cars = Arc::new(InMemoryCarDirectory::new());
        let drivers = Arc::new(InMemoryDriverDirectory::new());
        let events = Arc::new(InMemoryEventStore::new());
        let outbox = Arc::new(InMemoryOutbox::new());

        let engine = EventLifecycleEngine::new(
            cars.clone(),
            drivers.clone(),
            events.clone(),
            policy,
        )
        .with_outbox(outbox.clone());

        Self {
            engine: Arc::new(engine),
            cars,
            drivers,
            events,
            outbox,
            manager_id: IdFixtures::manager_id(),
        }
    }

    /// Registers a car built by `builder`
    pub async fn add(&self, builder: CarBuilder) -> Car {
        let car = builder.build();
        self.cars
            .insert(car.clone())
            .await
            .expect("test car plate must be unique");
        car
    }

    /// Registers an available, active car at `odometer`
    pub async fn add_car(&self, odometer: u64) -> Car {
        self.add(CarBuilder::new().with_odometer(odometer)).await
    }

    /// Registers an active driver
    pub async fn add_driver(&self) -> Driver {
        let driver = DriverBuilder::new().build();
        self.drivers.insert(driver.clone()).await;
        driver
    }

    pub async fn add_driver_record(&self, driver: Driver) -> Driver {
        self.drivers.insert(driver.clone()).await;
        driver
    }

    /// Checks `car_id` out to `driver_id` as the fleet's manager
    pub async fn checkout(
        &self,
        car_id: CarId,
        driver_id: DriverId,
        odometer: i64,
    ) -> Result<UsageEvent, UsageError> {
        self.engine
            .create_event(CreateEvent::new(car_id, driver_id, self.manager_id, odometer))
            .await
    }

    /// Current directory record of a car
    pub async fn car(&self, car_id: CarId) -> Car {
        self.cars
            .get_car(car_id)
            .await
            .expect("in-memory directory does not fail")
            .expect("car must exist")
    }

    pub async fn odometer(&self, car_id: CarId) -> Odometer {
        self.car(car_id).await.odometer
    }

    pub async fn all_events(&self) -> Vec<UsageEvent> {
        self.events
            .find_all()
            .await
            .expect("in-memory store does not fail")
    }

    /// Panics unless every car and event satisfies the fleet invariants
    pub async fn assert_consistent(&self) {
        let cars = self.cars.all().await;
        let events = self.all_events().await;
        assert_fleet_consistent(&cars, &events);
    }
}
