//! Record-store seams.
//!
//! Every mutation that another worker could race on is expressed as a
//! conditional update: the write only lands when the stored status still equals
//! the caller's `expected` value, and the caller learns whether it did.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use uyir_shared::{
    Booking, BookingStatus, Driver, Hospital, Offer, OfferStatus, Ping, Vehicle, VehicleStatus,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("record could not be decoded: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository trait for booking records
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Compare-and-set on status. `vehicle_id`, when given, is assigned in the
    /// same write. Returns the updated record, or `None` when the booking does
    /// not exist or its status is no longer `expected`.
    async fn transition_booking(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
        vehicle_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>>;

    async fn count_bookings(&self, statuses: &[BookingStatus]) -> StoreResult<u64>;
}

/// Repository trait for offer records
#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn insert_offers(&self, offers: &[Offer]) -> StoreResult<()>;

    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>>;

    async fn list_offers_by_status(&self, status: OfferStatus) -> StoreResult<Vec<Offer>>;

    async fn list_offers_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Offer>>;

    /// Compare-and-set on status; `true` when the write landed.
    async fn transition_offer(
        &self,
        id: Uuid,
        expected: OfferStatus,
        next: OfferStatus,
    ) -> StoreResult<bool>;

    /// Moves every still-`sent` offer of the booking except `keep` to
    /// `expired`. Returns how many were changed.
    async fn expire_sibling_offers(&self, booking_id: Uuid, keep: Uuid) -> StoreResult<u64>;
}

/// Repository trait for the ambulance fleet
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()>;

    async fn get_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>>;

    async fn list_vehicles(&self) -> StoreResult<Vec<Vehicle>>;

    /// Compare-and-set on status; `true` when the write landed.
    async fn transition_vehicle(
        &self,
        id: Uuid,
        expected: VehicleStatus,
        next: VehicleStatus,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn insert_driver(&self, driver: &Driver) -> StoreResult<()>;

    async fn count_online_drivers(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait HospitalRepository: Send + Sync {
    async fn insert_hospital(&self, hospital: &Hospital) -> StoreResult<()>;

    async fn list_hospitals(&self) -> StoreResult<Vec<Hospital>>;
}

/// Append-only location log
#[async_trait]
pub trait PingRepository: Send + Sync {
    async fn append_ping(&self, ping: &Ping) -> StoreResult<()>;

    async fn latest_ping(&self, booking_id: Uuid) -> StoreResult<Option<Ping>>;
}

/// Everything the dispatch engine persists, behind one handle.
pub trait RecordStore:
    BookingRepository
    + OfferRepository
    + VehicleRepository
    + DriverRepository
    + HospitalRepository
    + PingRepository
{
}

impl<T> RecordStore for T where
    T: BookingRepository
        + OfferRepository
        + VehicleRepository
        + DriverRepository
        + HospitalRepository
        + PingRepository
{
}
