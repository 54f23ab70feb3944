//! Route and ETA estimation between two points.
//!
//! [`RouteEstimator`] asks a [`RouteProvider`] (a road-network service) for the
//! route under a bounded timeout and degrades to a geodesic estimate at a fixed
//! average speed whenever the provider fails. Callers always get an estimate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uyir_shared::GeoPoint;

use crate::geo::geodesic_distance_km;

/// Where an estimate came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteEstimate {
    pub distance_m: i64,
    pub duration_s: i64,
    /// Encoded polyline of the road path, when the provider returned one
    pub polyline: Option<String>,
    pub source: RouteSource,
}

impl RouteEstimate {
    /// Whole minutes of travel, never less than one.
    pub fn eta_minutes(&self) -> i64 {
        eta_minutes(self.duration_s)
    }
}

pub fn eta_minutes(duration_s: i64) -> i64 {
    (duration_s / 60).max(1)
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("routing provider unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("routing provider returned no routes")]
    EmptyResponse,
    #[error("routing provider response malformed: {0}")]
    Malformed(String),
}

/// A road-network routing backend
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<RouteEstimate, RouteError>;
}

/// Deterministic estimate: geodesic distance driven at `speed_kmh`.
pub fn fallback_estimate(origin: GeoPoint, destination: GeoPoint, speed_kmh: f64) -> RouteEstimate {
    let km = geodesic_distance_km(origin, destination);
    RouteEstimate {
        distance_m: (km * 1000.0) as i64,
        duration_s: (km / speed_kmh * 3600.0) as i64,
        polyline: None,
        source: RouteSource::Fallback,
    }
}

#[derive(Clone)]
pub struct RouteEstimator {
    provider: Option<Arc<dyn RouteProvider>>,
    timeout: Duration,
    fallback_speed_kmh: f64,
}

impl RouteEstimator {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_SPEED_KMH: f64 = 30.0;

    pub fn new(provider: Arc<dyn RouteProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
            fallback_speed_kmh: Self::DEFAULT_SPEED_KMH,
        }
    }

    /// An estimator that never calls out and always uses the geodesic fallback.
    pub fn offline() -> Self {
        Self {
            provider: None,
            timeout: Self::DEFAULT_TIMEOUT,
            fallback_speed_kmh: Self::DEFAULT_SPEED_KMH,
        }
    }

    pub fn with_fallback_speed(mut self, speed_kmh: f64) -> Self {
        if speed_kmh.is_finite() && speed_kmh > 0.0 {
            self.fallback_speed_kmh = speed_kmh;
        }
        self
    }

    pub fn fallback_speed_kmh(&self) -> f64 {
        self.fallback_speed_kmh
    }

    pub async fn estimate(&self, origin: GeoPoint, destination: GeoPoint) -> RouteEstimate {
        if let Some(provider) = &self.provider {
            match tokio::time::timeout(self.timeout, provider.route(origin, destination)).await {
                Ok(Ok(route)) if route.distance_m >= 0 && route.duration_s >= 0 => {
                    debug!(distance_m = route.distance_m, duration_s = route.duration_s, "route from provider");
                    return route;
                }
                Ok(Ok(route)) => {
                    warn!(distance_m = route.distance_m, duration_s = route.duration_s, "negative route figures, using geodesic fallback");
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "route provider failed, using geodesic fallback");
                }
                Err(_) => {
                    warn!(timeout_ms = self.timeout.as_millis() as u64, "route provider timed out, using geodesic fallback");
                }
            }
        }

        self.fallback(origin, destination)
    }

    pub fn fallback(&self, origin: GeoPoint, destination: GeoPoint) -> RouteEstimate {
        fallback_estimate(origin, destination, self.fallback_speed_kmh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl RouteProvider for FailingProvider {
        async fn route(&self, _: GeoPoint, _: GeoPoint) -> Result<RouteEstimate, RouteError> {
            Err(RouteError::UpstreamUnavailable("connection refused".to_string()))
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl RouteProvider for SlowProvider {
        async fn route(&self, _: GeoPoint, _: GeoPoint) -> Result<RouteEstimate, RouteError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(RouteError::EmptyResponse)
        }
    }

    struct FixedProvider;

    #[async_trait]
    impl RouteProvider for FixedProvider {
        async fn route(&self, _: GeoPoint, _: GeoPoint) -> Result<RouteEstimate, RouteError> {
            Ok(RouteEstimate {
                distance_m: 2400,
                duration_s: 420,
                polyline: Some("_p~iF~ps|U_ulLnnqC".to_string()),
                source: RouteSource::Provider,
            })
        }
    }

    fn pickup() -> GeoPoint {
        GeoPoint::new(13.05, 80.25)
    }

    fn hospital() -> GeoPoint {
        GeoPoint::new(13.06, 80.26)
    }

    #[test]
    fn test_fallback_formula() {
        let km = geodesic_distance_km(pickup(), hospital());
        let estimate = fallback_estimate(pickup(), hospital(), 30.0);

        assert_eq!(estimate.distance_m, (km * 1000.0) as i64);
        assert_eq!(estimate.duration_s, (km / 30.0 * 3600.0) as i64);
        assert_eq!(estimate.polyline, None);
        assert_eq!(estimate.source, RouteSource::Fallback);
    }

    #[tokio::test]
    async fn test_failing_provider_degrades_deterministically() {
        let estimator = RouteEstimator::new(Arc::new(FailingProvider), Duration::from_millis(200));

        let first = estimator.estimate(pickup(), hospital()).await;
        let second = estimator.estimate(pickup(), hospital()).await;

        assert_eq!(first, second);
        assert_eq!(first, fallback_estimate(pickup(), hospital(), 30.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades() {
        let estimator = RouteEstimator::new(Arc::new(SlowProvider), Duration::from_secs(5));
        let estimate = estimator.estimate(pickup(), hospital()).await;
        assert_eq!(estimate.source, RouteSource::Fallback);
    }

    #[tokio::test]
    async fn test_provider_result_is_used() {
        let estimator = RouteEstimator::new(Arc::new(FixedProvider), Duration::from_secs(5));
        let estimate = estimator.estimate(pickup(), hospital()).await;

        assert_eq!(estimate.source, RouteSource::Provider);
        assert_eq!(estimate.distance_m, 2400);
        assert_eq!(estimate.eta_minutes(), 7);
    }

    #[test]
    fn test_eta_minutes_floor_of_one() {
        assert_eq!(eta_minutes(0), 1);
        assert_eq!(eta_minutes(59), 1);
        assert_eq!(eta_minutes(185), 3);
    }

    #[test]
    fn test_fallback_speed_guard() {
        let estimator = RouteEstimator::offline().with_fallback_speed(-5.0);
        assert_eq!(estimator.fallback_speed_kmh(), 30.0);

        let estimator = RouteEstimator::offline().with_fallback_speed(60.0);
        let slow = fallback_estimate(pickup(), hospital(), 30.0);
        let fast = estimator.fallback(pickup(), hospital());
        assert!(fast.duration_s < slow.duration_s);
    }
}
