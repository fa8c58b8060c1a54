//! Usage reports
//!
//! Read-only projections over the event store and the car directory. Reports
//! take no locks; a report racing with a command may see the state before or
//! after it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use core_kernel::{CarId, DriverId, ReportingPeriod};
use domain_fleet::CarDirectory;

use crate::error::UsageError;
use crate::event::UsageEvent;
use crate::store::EventStore;

/// Usage of one car within a reporting period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarUsageSummary {
    pub car_id: CarId,
    /// `None` if the car has since been removed from the directory
    pub license_plate: Option<String>,
    pub event_count: usize,
    pub open_events: usize,
    /// Distance over CLOSED events only
    pub total_distance: u64,
}

impl CarUsageSummary {
    fn new(car_id: CarId) -> Self {
        Self {
            car_id,
            license_plate: None,
            event_count: 0,
            open_events: 0,
            total_distance: 0,
        }
    }

    fn record(&mut self, event: &UsageEvent) {
        self.event_count += 1;
        if event.is_open() {
            self.open_events += 1;
        }
        self.total_distance = self
            .total_distance
            .saturating_add(event.distance().unwrap_or(0));
    }
}

pub struct UsageReports {
    events: Arc<dyn EventStore>,
    cars: Arc<dyn CarDirectory>,
}

impl UsageReports {
    pub fn new(events: Arc<dyn EventStore>, cars: Arc<dyn CarDirectory>) -> Self {
        Self { events, cars }
    }

    /// The driver's events overlapping `period`, ordered by `start_at`
    pub async fn events_by_driver(
        &self,
        driver_id: DriverId,
        period: &ReportingPeriod,
    ) -> Result<Vec<UsageEvent>, UsageError> {
        let events = self.events.find_in_period(period).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.driver_id == driver_id)
            .collect())
    }

    /// One summary per car with events overlapping `period`, ordered by plate
    pub async fn cars_used_in_period(
        &self,
        period: &ReportingPeriod,
    ) -> Result<Vec<CarUsageSummary>, UsageError> {
        let mut by_car: BTreeMap<CarId, CarUsageSummary> = BTreeMap::new();
        for event in self.events.find_in_period(period).await? {
            by_car
                .entry(event.car_id)
                .or_insert_with(|| CarUsageSummary::new(event.car_id))
                .record(&event);
        }

        let mut summaries = Vec::with_capacity(by_car.len());
        for (car_id, mut summary) in by_car {
            summary.license_plate = self.cars.get_car(car_id).await?.map(|car| car.license_plate);
            summaries.push(summary);
        }

        // Removed cars sort last
        summaries.sort_by(|a, b| {
            (a.license_plate.is_none(), &a.license_plate, a.car_id)
                .cmp(&(b.license_plate.is_none(), &b.license_plate, b.car_id))
        });
        Ok(summaries)
    }
}
