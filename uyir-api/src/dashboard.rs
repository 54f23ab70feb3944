use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;
use uyir_shared::BookingStatus;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/dashboard/metrics", get(dashboard_metrics))
}

#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub active_trips: u64,
    pub drivers_online: u64,
    pub bookings_by_status: BTreeMap<&'static str, u64>,
}

async fn dashboard_metrics(State(state): State<AppState>) -> Result<Json<DashboardMetrics>, AppError> {
    let active_trips = state.store.count_bookings(&BookingStatus::ACTIVE_TRIP).await?;
    let drivers_online = state.store.count_online_drivers().await?;

    let mut bookings_by_status = BTreeMap::new();
    for status in BookingStatus::ALL {
        bookings_by_status.insert(status.as_str(), state.store.count_bookings(&[status]).await?);
    }

    Ok(Json(DashboardMetrics {
        active_trips,
        drivers_online,
        bookings_by_status,
    }))
}
