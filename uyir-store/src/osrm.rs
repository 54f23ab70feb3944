use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use uyir_core::routing::{RouteError, RouteEstimate, RouteProvider, RouteSource};
use uyir_shared::GeoPoint;

/// OSRM `route` service client
#[derive(Clone)]
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Option<String>,
}

impl OsrmClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// OSRM expects `lng,lat` pairs.
    fn route_url(&self, origin: GeoPoint, destination: GeoPoint) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=polyline",
            self.base_url, origin.lng, origin.lat, destination.lng, destination.lat
        )
    }
}

fn parse_route(body: &str) -> Result<RouteEstimate, RouteError> {
    let response: OsrmResponse =
        serde_json::from_str(body).map_err(|e| RouteError::Malformed(e.to_string()))?;
    let route = response.routes.into_iter().next().ok_or(RouteError::EmptyResponse)?;

    if !route.distance.is_finite() || !route.duration.is_finite() || route.distance < 0.0 || route.duration < 0.0 {
        return Err(RouteError::Malformed(format!(
            "distance={} duration={}",
            route.distance, route.duration
        )));
    }

    Ok(RouteEstimate {
        distance_m: route.distance as i64,
        duration_s: route.duration as i64,
        polyline: route.geometry.filter(|g| !g.is_empty()),
        source: RouteSource::Provider,
    })
}

#[async_trait]
impl RouteProvider for OsrmClient {
    async fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<RouteEstimate, RouteError> {
        let response = self
            .client
            .get(self.route_url(origin, destination))
            .send()
            .await
            .map_err(|e| RouteError::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| RouteError::UpstreamUnavailable(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| RouteError::UpstreamUnavailable(e.to_string()))?;

        parse_route(&body)
    }
}
