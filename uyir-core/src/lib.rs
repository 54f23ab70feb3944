pub mod geo;
pub mod repository;
pub mod routing;

use uyir_shared::GeoPoint;

pub use repository::{RecordStore, StoreError, StoreResult};
pub use routing::{RouteEstimate, RouteEstimator, RouteProvider, RouteSource};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Rejects coordinates that are out of range or not finite.
pub fn ensure_valid_point(point: &GeoPoint, field: &str) -> CoreResult<()> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(CoreError::ValidationError(format!(
            "{} must be a valid lat/lng pair, got ({}, {})",
            field, point.lat, point.lng
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_valid_point() {
        assert!(ensure_valid_point(&GeoPoint::new(13.05, 80.25), "pickup").is_ok());

        let err = ensure_valid_point(&GeoPoint::new(120.0, 80.25), "pickup").unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(msg) if msg.starts_with("pickup")));
    }
}
