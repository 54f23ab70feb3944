//! Process-local record store.
//!
//! Each collection sits behind its own `RwLock`; conditional updates check and
//! write under one write guard, which makes them atomic per record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use uyir_core::repository::{
    BookingRepository, DriverRepository, HospitalRepository, OfferRepository, PingRepository,
    StoreResult, VehicleRepository,
};
use uyir_shared::{
    Booking, BookingStatus, Driver, Hospital, Offer, OfferStatus, Ping, Vehicle, VehicleStatus,
};

#[derive(Default)]
pub struct MemoryStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    offers: RwLock<HashMap<Uuid, Offer>>,
    // Vectors keep insertion order, which dispatch uses as its tie-break.
    vehicles: RwLock<Vec<Vehicle>>,
    drivers: RwLock<Vec<Driver>>,
    hospitals: RwLock<Vec<Hospital>>,
    pings: RwLock<HashMap<Uuid, Vec<Ping>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_offers(mut offers: Vec<Offer>) -> Vec<Offer> {
    offers.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then(a.distance_km.total_cmp(&b.distance_km))
    });
    offers
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        self.bookings.write().await.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
        vehicle_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(booking) if booking.status == expected => {
                booking.status = next;
                if vehicle_id.is_some() {
                    booking.vehicle_id = vehicle_id;
                }
                booking.updated_at = at;
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn count_bookings(&self, statuses: &[BookingStatus]) -> StoreResult<u64> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().filter(|b| statuses.contains(&b.status)).count() as u64)
    }
}

#[async_trait]
impl OfferRepository for MemoryStore {
    async fn insert_offers(&self, offers: &[Offer]) -> StoreResult<()> {
        let mut stored = self.offers.write().await;
        for offer in offers {
            stored.insert(offer.id, offer.clone());
        }
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>> {
        Ok(self.offers.read().await.get(&id).cloned())
    }

    async fn list_offers_by_status(&self, status: OfferStatus) -> StoreResult<Vec<Offer>> {
        let offers = self.offers.read().await;
        Ok(sorted_offers(offers.values().filter(|o| o.status == status).cloned().collect()))
    }

    async fn list_offers_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Offer>> {
        let offers = self.offers.read().await;
        Ok(sorted_offers(offers.values().filter(|o| o.booking_id == booking_id).cloned().collect()))
    }

    async fn transition_offer(&self, id: Uuid, expected: OfferStatus, next: OfferStatus) -> StoreResult<bool> {
        let mut offers = self.offers.write().await;
        match offers.get_mut(&id) {
            Some(offer) if offer.status == expected => {
                offer.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_sibling_offers(&self, booking_id: Uuid, keep: Uuid) -> StoreResult<u64> {
        let mut offers = self.offers.write().await;
        let mut changed = 0;
        for offer in offers.values_mut() {
            if offer.booking_id == booking_id && offer.id != keep && offer.status == OfferStatus::Sent {
                offer.status = OfferStatus::Expired;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl VehicleRepository for MemoryStore {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        self.vehicles.write().await.push(vehicle.clone());
        Ok(())
    }

    async fn get_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>> {
        Ok(self.vehicles.read().await.iter().find(|v| v.id == id).cloned())
    }

    async fn list_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        Ok(self.vehicles.read().await.clone())
    }

    async fn transition_vehicle(&self, id: Uuid, expected: VehicleStatus, next: VehicleStatus) -> StoreResult<bool> {
        let mut vehicles = self.vehicles.write().await;
        match vehicles.iter_mut().find(|v| v.id == id) {
            Some(vehicle) if vehicle.status == expected => {
                vehicle.status = next;
                vehicle.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl DriverRepository for MemoryStore {
    async fn insert_driver(&self, driver: &Driver) -> StoreResult<()> {
        self.drivers.write().await.push(driver.clone());
        Ok(())
    }

    async fn count_online_drivers(&self) -> StoreResult<u64> {
        Ok(self.drivers.read().await.iter().filter(|d| d.online).count() as u64)
    }
}

#[async_trait]
impl HospitalRepository for MemoryStore {
    async fn insert_hospital(&self, hospital: &Hospital) -> StoreResult<()> {
        self.hospitals.write().await.push(hospital.clone());
        Ok(())
    }

    async fn list_hospitals(&self) -> StoreResult<Vec<Hospital>> {
        Ok(self.hospitals.read().await.clone())
    }
}

#[async_trait]
impl PingRepository for MemoryStore {
    async fn append_ping(&self, ping: &Ping) -> StoreResult<()> {
        self.pings
            .write()
            .await
            .entry(ping.booking_id)
            .or_default()
            .push(ping.clone());
        Ok(())
    }

    async fn latest_ping(&self, booking_id: Uuid) -> StoreResult<Option<Ping>> {
        let pings = self.pings.read().await;
        Ok(pings.get(&booking_id).and_then(|log| log.last().cloned()))
    }
}
