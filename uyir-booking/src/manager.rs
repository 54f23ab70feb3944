use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use uyir_catalog::FareCalculator;
use uyir_core::ensure_valid_point;
use uyir_core::RecordStore;
use uyir_core::RouteEstimator;
use uyir_shared::{Booking, BookingStatus, GeoPoint, VehicleClass, VehicleStatus};

use crate::code::booking_code;
use crate::error::{BookingError, BookingResult};
use crate::machine::validate_transition;

/// Input for a new booking, already typed at the boundary
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub pickup: GeoPoint,
    pub destination: GeoPoint,
    pub hospital_id: Option<Uuid>,
    pub vehicle_class: VehicleClass,
}

/// Owns the booking lifecycle: creation, lookup and status transitions
#[derive(Clone)]
pub struct BookingManager {
    store: Arc<dyn RecordStore>,
    routes: RouteEstimator,
    fares: FareCalculator,
}

impl BookingManager {
    pub fn new(store: Arc<dyn RecordStore>, routes: RouteEstimator, fares: FareCalculator) -> Self {
        Self { store, routes, fares }
    }

    /// Create a booking in `REQUESTED` with route, ETA and fare filled in
    pub async fn create(&self, request: NewBooking) -> BookingResult<Booking> {
        ensure_valid_point(&request.pickup, "pickup")?;
        ensure_valid_point(&request.destination, "destination")?;

        let route = self.routes.estimate(request.pickup, request.destination).await;
        let fare = self.fares.estimate(route.distance_m, request.vehicle_class);
        let now = Utc::now();

        let booking = Booking {
            id: Uuid::new_v4(),
            code: booking_code(),
            pickup: request.pickup,
            destination: request.destination,
            hospital_id: request.hospital_id,
            vehicle_class: request.vehicle_class,
            status: BookingStatus::Requested,
            vehicle_id: None,
            distance_m: route.distance_m,
            duration_s: route.duration_s,
            eta_mins: route.eta_minutes(),
            fare,
            route_polyline: route.polyline,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_booking(&booking).await?;
        info!(booking_id = %booking.id, code = %booking.code, fare = booking.fare, "Booking requested");

        Ok(booking)
    }

    pub async fn get(&self, id: Uuid) -> BookingResult<Booking> {
        self.store
            .get_booking(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }

    /// Apply a status given as free text (HTTP body, driver channel)
    pub async fn set_status(&self, id: Uuid, raw_status: &str) -> BookingResult<Booking> {
        let next = raw_status
            .parse::<BookingStatus>()
            .map_err(|e| BookingError::InvalidStatus(e.to_string()))?;
        self.transition(id, next).await
    }

    /// Validate and apply one lifecycle step.
    ///
    /// The write is a compare-and-set on the status that was validated; if
    /// another worker moved the booking first, the new state is re-validated.
    /// Status only moves forward, so the loop is bounded by the chain length.
    pub async fn transition(&self, id: Uuid, next: BookingStatus) -> BookingResult<Booking> {
        loop {
            let current = self.get(id).await?;
            validate_transition(current.status, next)
                .map_err(|e| BookingError::from_transition(id, e))?;

            let updated = self
                .store
                .transition_booking(id, current.status, next, None, Utc::now())
                .await?;

            if let Some(booking) = updated {
                info!(booking_id = %id, from = %current.status, to = %next, "Booking status changed");
                self.after_transition(current.status, &booking).await?;
                return Ok(booking);
            }
        }
    }

    async fn after_transition(&self, from: BookingStatus, booking: &Booking) -> BookingResult<()> {
        // Once out of REQUESTED no outstanding offer can win any more.
        if from == BookingStatus::Requested {
            let expired = self.store.expire_sibling_offers(booking.id, Uuid::nil()).await?;
            if expired > 0 {
                info!(booking_id = %booking.id, expired, "Withdrew outstanding offers");
            }
        }

        if booking.status.is_terminal() {
            if let Some(vehicle_id) = booking.vehicle_id {
                let released = self
                    .store
                    .transition_vehicle(vehicle_id, VehicleStatus::OnTrip, VehicleStatus::Idle)
                    .await?;
                if !released {
                    warn!(booking_id = %booking.id, vehicle_id = %vehicle_id, "Vehicle was not on trip at release");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uyir_core::repository::{BookingRepository, OfferRepository, VehicleRepository};
    use uyir_core::RouteSource;
    use uyir_store::MemoryStore;
    use uyir_shared::{Offer, OfferStatus, Vehicle};

    fn manager_with(store: Arc<MemoryStore>) -> BookingManager {
        BookingManager::new(store, RouteEstimator::offline(), FareCalculator::default())
    }

    fn request() -> NewBooking {
        NewBooking {
            pickup: GeoPoint::new(13.05, 80.25),
            destination: GeoPoint::new(13.06, 80.26),
            hospital_id: None,
            vehicle_class: VehicleClass::Bls,
        }
    }

    #[tokio::test]
    async fn test_create_booking() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let booking = manager.create(request()).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Requested);
        assert!(booking.fare > 0);
        assert!(booking.eta_mins >= 1);
        assert!(booking.code.starts_with("UYR"));

        let expected = RouteEstimator::offline().fallback(request().pickup, request().destination);
        assert_eq!(expected.source, RouteSource::Fallback);
        assert_eq!(booking.distance_m, expected.distance_m);
        assert_eq!(booking.duration_s, expected.duration_s);

        let stored = manager.get(booking.id).await.unwrap();
        assert_eq!(stored, booking);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_points() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let mut bad = request();
        bad.destination = GeoPoint::new(f64::NAN, 80.0);

        let err = manager.create(bad).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_booking() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let id = Uuid::new_v4();
        assert!(matches!(manager.get(id).await, Err(BookingError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let booking = manager.create(request()).await.unwrap();

        let mut last_update = booking.updated_at;
        for status in ["accepted", "enroute", "at_pickup", "to_hospital", "completed"] {
            let updated = manager.set_status(booking.id, status).await.unwrap();
            assert_eq!(updated.status.as_str(), status.to_ascii_uppercase());
            assert!(updated.updated_at >= last_update);
            last_update = updated.updated_at;
        }

        let err = manager.set_status(booking.id, "canceled").await.unwrap_err();
        assert!(matches!(err, BookingError::Terminal { status: BookingStatus::Completed, .. }));
    }

    #[tokio::test]
    async fn test_skip_and_unknown_status() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let booking = manager.create(request()).await.unwrap();

        let err = manager.set_status(booking.id, "to_hospital").await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidStatus(_)));

        let err = manager.set_status(booking.id, "flying").await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidStatus(_)));

        // Rejected transitions leave the booking untouched.
        assert_eq!(manager.get(booking.id).await.unwrap().status, BookingStatus::Requested);
    }

    #[tokio::test]
    async fn test_cancel_is_terminal() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        let booking = manager.create(request()).await.unwrap();

        manager.transition(booking.id, BookingStatus::Canceled).await.unwrap();
        let err = manager.transition(booking.id, BookingStatus::Accepted).await.unwrap_err();
        assert!(matches!(err, BookingError::Terminal { status: BookingStatus::Canceled, .. }));
    }

    #[tokio::test]
    async fn test_terminal_status_releases_vehicle() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        let booking = manager.create(request()).await.unwrap();

        let mut vehicle = Vehicle::new("TN01AB1234", VehicleClass::Bls, Some(GeoPoint::new(13.05, 80.25)));
        vehicle.status = VehicleStatus::OnTrip;
        store.insert_vehicle(&vehicle).await.unwrap();

        // Assign the vehicle the way offer acceptance does.
        store
            .transition_booking(booking.id, BookingStatus::Requested, BookingStatus::Accepted, Some(vehicle.id), Utc::now())
            .await
            .unwrap()
            .unwrap();

        manager.transition(booking.id, BookingStatus::Enroute).await.unwrap();
        let on_trip = store.get_vehicle(vehicle.id).await.unwrap().unwrap();
        assert_eq!(on_trip.status, VehicleStatus::OnTrip);

        manager.transition(booking.id, BookingStatus::Canceled).await.unwrap();
        let released = store.get_vehicle(vehicle.id).await.unwrap().unwrap();
        assert_eq!(released.status, VehicleStatus::Idle);
    }

    #[tokio::test]
    async fn test_leaving_requested_expires_offers() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());
        let booking = manager.create(request()).await.unwrap();

        let offer = Offer::new(booking.id, Uuid::new_v4(), 0.5, Utc::now(), chrono::Duration::seconds(15));
        store.insert_offers(&[offer.clone()]).await.unwrap();

        manager.transition(booking.id, BookingStatus::Canceled).await.unwrap();

        let offer = store.get_offer(offer.id).await.unwrap().unwrap();
        assert_eq!(offer.status, OfferStatus::Expired);
    }
}
