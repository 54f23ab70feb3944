use std::sync::Arc;
use uyir_booking::BookingManager;
use uyir_catalog::FareCalculator;
use uyir_core::{RecordStore, RouteEstimator};
use uyir_dispatch::{Dispatcher, OfferArbitrator, OfferPolicy};
use uyir_tracking::TrackingHub;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub dispatcher: Dispatcher,
    pub tracking: TrackingHub,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        routes: RouteEstimator,
        fares: FareCalculator,
        policy: OfferPolicy,
        channel_capacity: usize,
    ) -> Result<Self, prometheus::Error> {
        let bookings = BookingManager::new(store.clone(), routes.clone(), fares);
        let arbitrator = OfferArbitrator::new(store.clone(), policy);
        let tracking = TrackingHub::new(store.clone(), bookings.clone(), routes)
            .with_capacity(channel_capacity);

        Ok(Self {
            store,
            dispatcher: Dispatcher::new(bookings, arbitrator),
            tracking,
            metrics: Arc::new(Metrics::new()?),
        })
    }

    pub fn bookings(&self) -> &BookingManager {
        self.dispatcher.bookings()
    }

    pub fn offers(&self) -> &OfferArbitrator {
        self.dispatcher.arbitrator()
    }
}
