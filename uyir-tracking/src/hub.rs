//! Per-booking live tracking.
//!
//! Each booking with at least one subscriber has its own broadcast topic.
//! Publishers persist first and broadcast second, from their own task, so the
//! order subscribers observe follows the publisher. Subscribers that fall
//! behind the channel capacity miss events rather than slow the publisher.

use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info};
use uuid::Uuid;
use uyir_booking::BookingManager;
use uyir_core::geo::{geodesic_distance_m, initial_bearing_deg};
use uyir_core::{ensure_valid_point, RecordStore, RouteEstimator};
use uyir_shared::{Booking, BookingStatus, GeoPoint, Ping, TrackingEvent};

use crate::error::TrackingResult;

/// Pings closer than this to the previous one carry no heading
const MIN_HEADING_DISTANCE_M: f64 = 5.0;

/// Last known position of a booking's ambulance
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackSnapshot {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub location: Option<GeoPoint>,
    pub eta_mins: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct TrackingHub {
    store: Arc<dyn RecordStore>,
    bookings: BookingManager,
    routes: RouteEstimator,
    topics: Arc<RwLock<HashMap<Uuid, broadcast::Sender<TrackingEvent>>>>,
    capacity: usize,
}

impl TrackingHub {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(store: Arc<dyn RecordStore>, bookings: BookingManager, routes: RouteEstimator) -> Self {
        Self {
            store,
            bookings,
            routes,
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: Self::DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Receive every event published for the booking from now on.
    pub async fn subscribe(&self, booking_id: Uuid) -> TrackingResult<broadcast::Receiver<TrackingEvent>> {
        self.bookings.get(booking_id).await?;

        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let sender = topics
            .entry(booking_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        debug!(%booking_id, subscribers = sender.receiver_count() + 1, "Tracking subscriber joined");
        Ok(sender.subscribe())
    }

    /// Like [`subscribe`](Self::subscribe), skipping over lag gaps.
    pub async fn subscribe_stream(
        &self,
        booking_id: Uuid,
    ) -> TrackingResult<impl Stream<Item = TrackingEvent> + Send + 'static> {
        let rx = self.subscribe(booking_id).await?;
        Ok(BroadcastStream::new(rx).filter_map(move |item| async move {
            match item {
                Ok(event) => Some(event),
                Err(lagged) => {
                    debug!(%booking_id, error = %lagged, "Tracking subscriber lagged");
                    None
                }
            }
        }))
    }

    /// Record a driver location and fan it out with a fresh ETA.
    pub async fn publish_location(&self, booking_id: Uuid, location: GeoPoint) -> TrackingResult<Ping> {
        ensure_valid_point(&location, "location").map_err(uyir_booking::BookingError::from)?;
        let booking = self.bookings.get(booking_id).await?;

        let eta_mins = eta_target(&booking).map(|target| self.routes.fallback(location, target).eta_minutes());
        let heading_deg = self
            .store
            .latest_ping(booking_id)
            .await?
            .filter(|prev| geodesic_distance_m(prev.location, location) >= MIN_HEADING_DISTANCE_M)
            .map(|prev| initial_bearing_deg(prev.location, location));

        let ping = Ping::new(booking_id, location, eta_mins);
        self.store.append_ping(&ping).await?;

        self.broadcast(TrackingEvent::LocationUpdate {
            booking_id,
            location,
            eta_mins,
            heading_deg,
            ts: ping.recorded_at,
        });
        Ok(ping)
    }

    /// Apply a status pushed over the live channel. Only applied transitions
    /// are broadcast.
    pub async fn publish_status(&self, booking_id: Uuid, raw_status: &str) -> TrackingResult<Booking> {
        let booking = self.bookings.set_status(booking_id, raw_status).await?;
        self.broadcast_status(&booking);
        Ok(booking)
    }

    /// Announce a status change applied elsewhere (HTTP, offer acceptance).
    /// A terminal status is the last event of the booking and closes its topic.
    pub fn broadcast_status(&self, booking: &Booking) {
        self.broadcast(TrackingEvent::StatusChanged {
            booking_id: booking.id,
            status: booking.status,
            ts: booking.updated_at,
        });

        if booking.status.is_terminal() {
            let removed = self
                .topics
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&booking.id);
            if removed.is_some() {
                info!(booking_id = %booking.id, status = %booking.status, "Tracking topic closed");
            }
        }
    }

    /// Called after a subscriber dropped its receiver. The topic goes away
    /// with its last subscriber.
    pub fn leave(&self, booking_id: Uuid) {
        self.prune(booking_id);
    }

    pub async fn snapshot(&self, booking_id: Uuid) -> TrackingResult<TrackSnapshot> {
        let booking = self.bookings.get(booking_id).await?;
        let latest = self.store.latest_ping(booking_id).await?;

        Ok(TrackSnapshot {
            booking_id,
            status: booking.status,
            location: latest.as_ref().map(|p| p.location),
            eta_mins: latest.as_ref().and_then(|p| p.eta_mins),
            updated_at: latest.map(|p| p.recorded_at),
        })
    }

    /// Bookings with a live topic
    pub fn topic_count(&self) -> usize {
        self.topics.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn broadcast(&self, event: TrackingEvent) {
        let booking_id = event.booking_id();
        let sender = {
            let topics = self.topics.read().unwrap_or_else(|e| e.into_inner());
            topics.get(&booking_id).cloned()
        };

        let Some(sender) = sender else {
            return;
        };

        match sender.send(event) {
            Ok(delivered) => debug!(%booking_id, delivered, "Tracking event sent"),
            // Every receiver is gone
            Err(_) => self.prune(booking_id),
        }
    }

    fn prune(&self, booking_id: Uuid) {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        if topics.get(&booking_id).is_some_and(|s| s.receiver_count() == 0) {
            topics.remove(&booking_id);
            debug!(%booking_id, "Tracking topic dropped, no subscribers left");
        }
    }
}

/// Where the ambulance is heading at this stage of the trip
fn eta_target(booking: &Booking) -> Option<GeoPoint> {
    match booking.status {
        BookingStatus::Requested | BookingStatus::Accepted | BookingStatus::Enroute => Some(booking.pickup),
        BookingStatus::AtPickup | BookingStatus::ToHospital => Some(booking.destination),
        BookingStatus::Completed | BookingStatus::Canceled => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uyir_booking::{BookingError, NewBooking};
    use uyir_catalog::FareCalculator;
    use uyir_shared::VehicleClass;
    use uyir_store::MemoryStore;

    use crate::error::TrackingError;

    async fn setup() -> (TrackingHub, Booking) {
        let store = Arc::new(MemoryStore::new());
        let routes = RouteEstimator::offline();
        let bookings = BookingManager::new(store.clone(), routes.clone(), FareCalculator::default());
        let booking = bookings
            .create(NewBooking {
                pickup: GeoPoint::new(13.05, 80.25),
                destination: GeoPoint::new(13.06, 80.26),
                hospital_id: None,
                vehicle_class: VehicleClass::Bls,
            })
            .await
            .unwrap();
        (TrackingHub::new(store, bookings, routes), booking)
    }

    #[tokio::test]
    async fn test_location_reaches_subscriber_with_eta() {
        let (hub, booking) = setup().await;
        let mut rx = hub.subscribe(booking.id).await.unwrap();

        hub.publish_location(booking.id, GeoPoint::new(13.10, 80.30)).await.unwrap();

        match rx.recv().await.unwrap() {
            TrackingEvent::LocationUpdate { booking_id, location, eta_mins, heading_deg, .. } => {
                assert_eq!(booking_id, booking.id);
                assert_eq!(location, GeoPoint::new(13.10, 80.30));
                // ~7.7 km to pickup at 30 km/h
                assert!(matches!(eta_mins, Some(m) if (14..=16).contains(&m)));
                assert!(heading_deg.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_events_keep_publisher_order() {
        let (hub, booking) = setup().await;
        let mut rx = hub.subscribe(booking.id).await.unwrap();

        let path = [
            GeoPoint::new(13.10, 80.30),
            GeoPoint::new(13.09, 80.29),
            GeoPoint::new(13.08, 80.28),
        ];
        for point in path {
            hub.publish_location(booking.id, point).await.unwrap();
        }

        for expected in path {
            match rx.recv().await.unwrap() {
                TrackingEvent::LocationUpdate { location, heading_deg, .. } => {
                    assert_eq!(location, expected);
                    if expected != path[0] {
                        // Heading south-west
                        assert!(matches!(heading_deg, Some(h) if (180.0..270.0).contains(&h)));
                    }
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_events_are_scoped_to_booking() {
        let (hub, booking) = setup().await;
        let other = hub
            .bookings
            .create(NewBooking {
                pickup: GeoPoint::new(13.0, 80.2),
                destination: GeoPoint::new(13.01, 80.21),
                hospital_id: None,
                vehicle_class: VehicleClass::Bls,
            })
            .await
            .unwrap();

        let mut rx = hub.subscribe(booking.id).await.unwrap();
        hub.publish_location(other.id, GeoPoint::new(13.0, 80.2)).await.unwrap();
        hub.publish_location(booking.id, GeoPoint::new(13.05, 80.25)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().booking_id(), booking.id);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_status_broadcast_only_when_applied() {
        let (hub, booking) = setup().await;
        let mut rx = hub.subscribe(booking.id).await.unwrap();

        // Skipping ahead is refused and nothing is sent
        let err = hub.publish_status(booking.id, "to_hospital").await.unwrap_err();
        assert!(matches!(err, TrackingError::Booking(BookingError::InvalidStatus(_))));
        assert!(rx.try_recv().is_err());

        let accepted = hub.publish_status(booking.id, "accepted").await.unwrap();
        assert_eq!(accepted.status, BookingStatus::Accepted);
        match rx.recv().await.unwrap() {
            TrackingEvent::StatusChanged { status, .. } => assert_eq!(status, BookingStatus::Accepted),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (hub, booking) = setup().await;
        let empty = hub.snapshot(booking.id).await.unwrap();
        assert!(empty.location.is_none() && empty.eta_mins.is_none());

        hub.publish_location(booking.id, GeoPoint::new(13.06, 80.26)).await.unwrap();
        let snap = hub.snapshot(booking.id).await.unwrap();
        assert_eq!(snap.location, Some(GeoPoint::new(13.06, 80.26)));
        assert!(snap.eta_mins.unwrap() >= 1);

        assert!(matches!(
            hub.snapshot(Uuid::new_v4()).await,
            Err(TrackingError::Booking(BookingError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_invalid_location_rejected() {
        let (hub, booking) = setup().await;
        let err = hub.publish_location(booking.id, GeoPoint::new(13.0, 181.0)).await.unwrap_err();
        assert!(matches!(err, TrackingError::Booking(BookingError::Validation(_))));
        assert!(hub.snapshot(booking.id).await.unwrap().location.is_none());
    }

    #[tokio::test]
    async fn test_topic_dropped_after_last_subscriber() {
        let (hub, booking) = setup().await;
        let rx = hub.subscribe(booking.id).await.unwrap();
        assert_eq!(hub.topic_count(), 1);
        drop(rx);

        hub.publish_location(booking.id, GeoPoint::new(13.05, 80.25)).await.unwrap();
        assert_eq!(hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_leave_drops_idle_topics() {
        let (hub, booking) = setup().await;
        let mut others = Vec::new();
        for i in 0..20 {
            let offset = i as f64 * 0.001;
            let other = hub
                .bookings
                .create(NewBooking {
                    pickup: GeoPoint::new(13.0 + offset, 80.2),
                    destination: GeoPoint::new(13.01, 80.21),
                    hospital_id: None,
                    vehicle_class: VehicleClass::Bls,
                })
                .await
                .unwrap();
            others.push(other.id);
        }

        let first = hub.subscribe(booking.id).await.unwrap();
        let second = hub.subscribe(booking.id).await.unwrap();
        for id in &others {
            drop(hub.subscribe(*id).await.unwrap());
            hub.leave(*id);
        }
        assert_eq!(hub.topic_count(), 1);

        // Still one subscriber on the booking
        drop(first);
        hub.leave(booking.id);
        assert_eq!(hub.topic_count(), 1);

        drop(second);
        hub.leave(booking.id);
        assert_eq!(hub.topic_count(), 0);
    }

    #[tokio::test]
    async fn test_terminal_status_closes_topic() {
        let (hub, booking) = setup().await;
        let mut rx = hub.subscribe(booking.id).await.unwrap();

        hub.publish_status(booking.id, "canceled").await.unwrap();
        assert_eq!(hub.topic_count(), 0);

        match rx.recv().await.unwrap() {
            TrackingEvent::StatusChanged { status, .. } => assert_eq!(status, BookingStatus::Canceled),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_stream_subscription() {
        let (hub, booking) = setup().await;
        let stream = hub.subscribe_stream(booking.id).await.unwrap();
        tokio::pin!(stream);

        hub.broadcast_status(&booking);
        let event = stream.next().await.unwrap();
        assert!(matches!(event, TrackingEvent::StatusChanged { status: BookingStatus::Requested, .. }));
    }
}
