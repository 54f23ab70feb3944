use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use uyir_booking::NewBooking;
use uyir_shared::{Booking, GeoPoint, Offer, VehicleClass};
use uyir_tracking::TrackSnapshot;

use crate::error::{AppError, AppJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", post(create_booking))
        .route("/api/bookings/{id}", get(get_booking))
        .route("/api/bookings/{id}/status", patch(update_status))
        .route("/api/bookings/{id}/track", get(track_booking))
        .route("/api/bookings/{id}/offers", get(booking_offers))
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub pickup: GeoPoint,
    #[serde(alias = "hospital")]
    pub destination: GeoPoint,
    #[serde(default)]
    pub hospital_id: Option<Uuid>,
    #[serde(default, alias = "type")]
    pub vehicle_class: VehicleClass,
}

#[derive(Debug, Serialize)]
pub struct BookingCreatedResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub offers: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn create_booking(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), AppError> {
    let dispatched = state
        .dispatcher
        .request(NewBooking {
            pickup: req.pickup,
            destination: req.destination,
            hospital_id: req.hospital_id,
            vehicle_class: req.vehicle_class,
        })
        .await?;

    state.metrics.bookings_created.inc();
    state.metrics.offers_issued.inc_by(dispatched.offers.len() as u64);

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            booking: dispatched.booking,
            offers: dispatched.offers,
        }),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings().get(id).await?))
}

/// Status changes go through the lifecycle rules and are pushed to trackers.
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.tracking.publish_status(id, &req.status).await?;
    Ok(Json(booking))
}

async fn track_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackSnapshot>, AppError> {
    Ok(Json(state.tracking.snapshot(id).await?))
}

async fn booking_offers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Offer>>, AppError> {
    // 404 for unknown bookings rather than an empty list
    state.bookings().get(id).await?;
    Ok(Json(state.offers().offers_for_booking(id).await?))
}
