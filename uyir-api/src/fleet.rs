use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uyir_catalog::{rank_by_distance, search_hospitals, HospitalListing, HospitalQuery, RankedVehicle};
use uyir_shared::GeoPoint;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ambulances", get(list_ambulances))
        .route("/api/hospitals", get(list_hospitals))
}

#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub near: Option<String>,
    pub needs: Option<String>,
}

/// `near=lat,lng`; absent means unranked
fn parse_near(raw: Option<&str>) -> Result<Option<GeoPoint>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => GeoPoint::parse_pair(raw)
            .filter(GeoPoint::is_valid)
            .map(Some)
            .ok_or_else(|| AppError::ValidationError(format!("near must be 'lat,lng', got '{}'", raw))),
    }
}

async fn list_ambulances(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<RankedVehicle>>, AppError> {
    let near = parse_near(query.near.as_deref())?;
    let vehicles = state.store.list_vehicles().await?;

    let listing = match near {
        Some(from) => rank_by_distance(vehicles, from),
        None => vehicles
            .into_iter()
            .map(|vehicle| RankedVehicle { vehicle, distance_km: None })
            .collect(),
    };
    Ok(Json(listing))
}

async fn list_hospitals(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> Result<Json<Vec<HospitalListing>>, AppError> {
    let search = HospitalQuery {
        needs: query.needs.as_deref().map(HospitalQuery::parse_needs).unwrap_or_default(),
        near: parse_near(query.near.as_deref())?,
    };
    let hospitals = state.store.list_hospitals().await?;
    Ok(Json(search_hospitals(hospitals, &search)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_near() {
        assert_eq!(parse_near(None).unwrap(), None);
        assert_eq!(parse_near(Some("")).unwrap(), None);
        assert_eq!(parse_near(Some("13.05,80.25")).unwrap(), Some(GeoPoint::new(13.05, 80.25)));
        assert!(parse_near(Some("13.05")).is_err());
        assert!(parse_near(Some("95,80")).is_err());
    }
}
