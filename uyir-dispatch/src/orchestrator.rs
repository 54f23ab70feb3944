use serde::Serialize;
use tracing::info;
use uyir_booking::{BookingManager, NewBooking};
use uyir_shared::{Booking, Offer};

use crate::arbitrator::OfferArbitrator;
use crate::error::DispatchResult;

/// A freshly requested booking and the offers sent for it
#[derive(Debug, Clone, Serialize)]
pub struct Dispatched {
    pub booking: Booking,
    pub offers: Vec<Offer>,
}

/// Request flow: create the booking, then fan offers out to nearby vehicles
#[derive(Clone)]
pub struct Dispatcher {
    bookings: BookingManager,
    arbitrator: OfferArbitrator,
}

impl Dispatcher {
    pub fn new(bookings: BookingManager, arbitrator: OfferArbitrator) -> Self {
        Self { bookings, arbitrator }
    }

    pub fn bookings(&self) -> &BookingManager {
        &self.bookings
    }

    pub fn arbitrator(&self) -> &OfferArbitrator {
        &self.arbitrator
    }

    pub async fn request(&self, request: NewBooking) -> DispatchResult<Dispatched> {
        let booking = self.bookings.create(request).await?;
        let offers = self.arbitrator.issue_offers(&booking).await?;
        info!(booking_id = %booking.id, offers = offers.len(), "Booking dispatched");
        Ok(Dispatched { booking, offers })
    }
}
