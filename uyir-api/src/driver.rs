use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;
use uyir_dispatch::DispatchError;
use uyir_shared::{Booking, Offer, OfferStatus};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/driver/offers", get(pending_offers))
        .route("/api/driver/offers/{id}/accept", post(accept_offer))
        .route("/api/driver/offers/{id}/reject", post(reject_offer))
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub status: OfferStatus,
    pub offer: Offer,
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct RejectResponse {
    pub status: OfferStatus,
    pub offer: Offer,
}

async fn pending_offers(State(state): State<AppState>) -> Result<Json<Vec<Offer>>, AppError> {
    Ok(Json(state.offers().list_pending(Utc::now()).await?))
}

async fn accept_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AcceptResponse>, AppError> {
    let accepted = match state.offers().accept(id).await {
        Ok(accepted) => accepted,
        Err(err) => {
            let outcome = match &err {
                DispatchError::AlreadyTaken(_) => "taken",
                DispatchError::OfferExpired(_) => "expired",
                DispatchError::OfferNotFound(_) => "not_found",
                _ => "failed",
            };
            state.metrics.record_accept(outcome);
            warn!(offer_id = %id, error = %err, "Offer accept refused");
            return Err(err.into());
        }
    };

    state.metrics.record_accept("won");
    state.tracking.broadcast_status(&accepted.booking);

    Ok(Json(AcceptResponse {
        status: accepted.offer.status,
        offer: accepted.offer,
        booking: accepted.booking,
    }))
}

async fn reject_offer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RejectResponse>, AppError> {
    let offer = state.offers().reject(id).await?;
    Ok(Json(RejectResponse {
        status: offer.status,
        offer,
    }))
}
