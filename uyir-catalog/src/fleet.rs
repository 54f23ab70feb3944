use serde::Serialize;
use uyir_core::geo::geodesic_distance_km;
use uyir_shared::{GeoPoint, Vehicle};

/// A vehicle annotated with its distance from a query point
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedVehicle {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub distance_km: Option<f64>,
}

/// Orders vehicles by geodesic distance from `from`, nearest first.
///
/// Vehicles without a position sort last. The sort is stable, so equal
/// distances keep their input order.
pub fn rank_by_distance(vehicles: Vec<Vehicle>, from: GeoPoint) -> Vec<RankedVehicle> {
    let mut ranked: Vec<RankedVehicle> = vehicles
        .into_iter()
        .map(|vehicle| {
            let distance_km = vehicle.location.map(|loc| geodesic_distance_km(from, loc));
            RankedVehicle { vehicle, distance_km }
        })
        .collect();

    ranked.sort_by(|a, b| {
        let a = a.distance_km.unwrap_or(f64::INFINITY);
        let b = b.distance_km.unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });

    ranked
}
