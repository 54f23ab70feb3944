//! Postgres record store.
//!
//! Queries are built at runtime so the crate compiles without a live database.
//! Every status change is a single `UPDATE ... WHERE status = $expected`, which
//! keeps compare-and-set semantics across processes sharing the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, Pool, Postgres};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;
use uyir_core::repository::{
    BookingRepository, DriverRepository, HospitalRepository, OfferRepository, PingRepository,
    StoreError, StoreResult, VehicleRepository,
};
use uyir_shared::{
    Booking, BookingStatus, Driver, GeoPoint, Hospital, Offer, OfferStatus, Ping, Vehicle,
    VehicleClass, VehicleStatus,
};

const BOOKING_COLUMNS: &str = "id, code, pickup_lat, pickup_lng, dest_lat, dest_lng, hospital_id, \
     vehicle_class, status, vehicle_id, distance_m, duration_s, eta_mins, fare, route_polyline, \
     created_at, updated_at";

const OFFER_COLUMNS: &str = "id, booking_id, vehicle_id, status, distance_km, created_at, expires_at";

const VEHICLE_COLUMNS: &str = "id, plate_no, class, status, lat, lng, driver_id, updated_at";

const PING_COLUMNS: &str = "id, booking_id, lat, lng, eta_mins, recorded_at";

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

#[derive(Clone)]
pub struct PgStore {
    pub pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

// ==========================================
// Row mapping
// ==========================================

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    code: String,
    pickup_lat: f64,
    pickup_lng: f64,
    dest_lat: f64,
    dest_lng: f64,
    hospital_id: Option<Uuid>,
    vehicle_class: String,
    status: String,
    vehicle_id: Option<Uuid>,
    distance_m: i64,
    duration_s: i64,
    eta_mins: i64,
    fare: i64,
    route_polyline: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            code: row.code,
            pickup: GeoPoint::new(row.pickup_lat, row.pickup_lng),
            destination: GeoPoint::new(row.dest_lat, row.dest_lng),
            hospital_id: row.hospital_id,
            vehicle_class: VehicleClass::from_str(&row.vehicle_class).map_err(StoreError::Decode)?,
            status: BookingStatus::from_str(&row.status)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            vehicle_id: row.vehicle_id,
            distance_m: row.distance_m,
            duration_s: row.duration_s,
            eta_mins: row.eta_mins,
            fare: row.fare,
            route_polyline: row.route_polyline,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OfferRow {
    id: Uuid,
    booking_id: Uuid,
    vehicle_id: Uuid,
    status: String,
    distance_km: f64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = StoreError;

    fn try_from(row: OfferRow) -> Result<Self, Self::Error> {
        let status = OfferStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Decode(format!("unknown offer status: {}", row.status)))?;
        Ok(Offer {
            id: row.id,
            booking_id: row.booking_id,
            vehicle_id: row.vehicle_id,
            status,
            distance_km: row.distance_km,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(FromRow)]
struct VehicleRow {
    id: Uuid,
    plate_no: String,
    class: String,
    status: String,
    lat: Option<f64>,
    lng: Option<f64>,
    driver_id: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VehicleRow> for Vehicle {
    type Error = StoreError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        Ok(Vehicle {
            id: row.id,
            plate_no: row.plate_no,
            class: VehicleClass::from_str(&row.class).map_err(StoreError::Decode)?,
            status: VehicleStatus::from_str(&row.status).map_err(StoreError::Decode)?,
            location: row.lat.zip(row.lng).map(|(lat, lng)| GeoPoint::new(lat, lng)),
            driver_id: row.driver_id,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct HospitalRow {
    id: Uuid,
    name: String,
    capabilities: Vec<String>,
    lat: f64,
    lng: f64,
}

impl From<HospitalRow> for Hospital {
    fn from(row: HospitalRow) -> Self {
        Hospital {
            id: row.id,
            name: row.name,
            capabilities: row.capabilities,
            location: GeoPoint::new(row.lat, row.lng),
        }
    }
}

#[derive(FromRow)]
struct PingRow {
    id: Uuid,
    booking_id: Uuid,
    lat: f64,
    lng: f64,
    eta_mins: Option<i64>,
    recorded_at: DateTime<Utc>,
}

impl From<PingRow> for Ping {
    fn from(row: PingRow) -> Self {
        Ping {
            id: row.id,
            booking_id: row.booking_id,
            location: GeoPoint::new(row.lat, row.lng),
            eta_mins: row.eta_mins,
            recorded_at: row.recorded_at,
        }
    }
}

fn decode_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ==========================================
// Repositories
// ==========================================

#[async_trait]
impl BookingRepository for PgStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(booking.id)
        .bind(&booking.code)
        .bind(booking.pickup.lat)
        .bind(booking.pickup.lng)
        .bind(booking.destination.lat)
        .bind(booking.destination.lng)
        .bind(booking.hospital_id)
        .bind(booking.vehicle_class.as_str())
        .bind(booking.status.as_str())
        .bind(booking.vehicle_id)
        .bind(booking.distance_m)
        .bind(booking.duration_s)
        .bind(booking.eta_mins)
        .bind(booking.fare)
        .bind(&booking.route_polyline)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
        vehicle_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings \
             SET status = $3, vehicle_id = COALESCE($4, vehicle_id), updated_at = $5 \
             WHERE id = $1 AND status = $2 \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(vehicle_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Booking::try_from).transpose()
    }

    async fn count_bookings(&self, statuses: &[BookingStatus]) -> StoreResult<u64> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE status = ANY($1)")
            .bind(statuses)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl OfferRepository for PgStore {
    async fn insert_offers(&self, offers: &[Offer]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for offer in offers {
            sqlx::query(&format!(
                "INSERT INTO offers ({OFFER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
            ))
            .bind(offer.id)
            .bind(offer.booking_id)
            .bind(offer.vehicle_id)
            .bind(offer.status.as_str())
            .bind(offer.distance_km)
            .bind(offer.created_at)
            .bind(offer.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> StoreResult<Option<Offer>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Offer::try_from).transpose()
    }

    async fn list_offers_by_status(&self, status: OfferStatus) -> StoreResult<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE status = $1 ORDER BY created_at, distance_km"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        decode_all(rows)
    }

    async fn list_offers_for_booking(&self, booking_id: Uuid) -> StoreResult<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE booking_id = $1 ORDER BY created_at, distance_km"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        decode_all(rows)
    }

    async fn transition_offer(&self, id: Uuid, expected: OfferStatus, next: OfferStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE offers SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(expected.as_str())
            .bind(next.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn expire_sibling_offers(&self, booking_id: Uuid, keep: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE offers SET status = 'expired' \
             WHERE booking_id = $1 AND id <> $2 AND status = 'sent'",
        )
        .bind(booking_id)
        .bind(keep)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl VehicleRepository for PgStore {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO vehicles ({VEHICLE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(vehicle.id)
        .bind(&vehicle.plate_no)
        .bind(vehicle.class.as_str())
        .bind(vehicle.status.as_str())
        .bind(vehicle.location.map(|p| p.lat))
        .bind(vehicle.location.map(|p| p.lng))
        .bind(&vehicle.driver_id)
        .bind(vehicle.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Vehicle::try_from).transpose()
    }

    async fn list_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        decode_all(rows)
    }

    async fn transition_vehicle(&self, id: Uuid, expected: VehicleStatus, next: VehicleStatus) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE vehicles SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl DriverRepository for PgStore {
    async fn insert_driver(&self, driver: &Driver) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO drivers (id, name, phone, rating, online, vehicle_id) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&driver.id)
        .bind(&driver.name)
        .bind(&driver.phone)
        .bind(driver.rating)
        .bind(driver.online)
        .bind(driver.vehicle_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn count_online_drivers(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drivers WHERE online")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl HospitalRepository for PgStore {
    async fn insert_hospital(&self, hospital: &Hospital) -> StoreResult<()> {
        sqlx::query("INSERT INTO hospitals (id, name, capabilities, lat, lng) VALUES ($1, $2, $3, $4, $5)")
            .bind(hospital.id)
            .bind(&hospital.name)
            .bind(&hospital.capabilities)
            .bind(hospital.location.lat)
            .bind(hospital.location.lng)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_hospitals(&self) -> StoreResult<Vec<Hospital>> {
        let rows = sqlx::query_as::<_, HospitalRow>(
            "SELECT id, name, capabilities, lat, lng FROM hospitals ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Hospital::from).collect())
    }
}

#[async_trait]
impl PingRepository for PgStore {
    async fn append_ping(&self, ping: &Ping) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO pings ({PING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(ping.id)
        .bind(ping.booking_id)
        .bind(ping.location.lat)
        .bind(ping.location.lng)
        .bind(ping.eta_mins)
        .bind(ping.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn latest_ping(&self, booking_id: Uuid) -> StoreResult<Option<Ping>> {
        let row = sqlx::query_as::<_, PingRow>(&format!(
            "SELECT {PING_COLUMNS} FROM pings WHERE booking_id = $1 ORDER BY seq DESC LIMIT 1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Ping::from))
    }
}
