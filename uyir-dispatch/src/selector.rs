use serde::Serialize;
use uyir_core::geo::geodesic_distance_km;
use uyir_shared::{GeoPoint, Vehicle, VehicleClass};

/// A dispatchable vehicle with its distance from the pickup
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Candidate {
    pub vehicle: Vehicle,
    pub distance_km: f64,
}

/// Nearest `limit` idle, located vehicles, closest first. Equal distances keep
/// their input order. `class` narrows the pool to one vehicle class.
pub fn select_candidates(
    vehicles: Vec<Vehicle>,
    pickup: GeoPoint,
    limit: usize,
    class: Option<VehicleClass>,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = vehicles
        .into_iter()
        .filter(|v| v.is_dispatchable())
        .filter(|v| class.map_or(true, |c| v.class == c))
        .filter_map(|vehicle| {
            let location = vehicle.location?;
            Some(Candidate {
                distance_km: geodesic_distance_km(pickup, location),
                vehicle,
            })
        })
        .collect();

    // `sort_by` is stable
    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use uyir_shared::VehicleStatus;

    fn vehicle(plate: &str, lat: f64, lng: f64) -> Vehicle {
        Vehicle::new(plate, VehicleClass::Bls, Some(GeoPoint::new(lat, lng)))
    }

    #[test]
    fn test_nearest_first_and_truncated() {
        let pickup = GeoPoint::new(13.05, 80.25);
        let vehicles = vec![
            vehicle("far", 13.20, 80.40),
            vehicle("near", 13.051, 80.251),
            vehicle("mid", 13.08, 80.27),
        ];

        let picked = select_candidates(vehicles, pickup, 2, None);
        let plates: Vec<&str> = picked.iter().map(|c| c.vehicle.plate_no.as_str()).collect();
        assert_eq!(plates, vec!["near", "mid"]);
        assert!(picked[0].distance_km < picked[1].distance_km);
    }

    #[test]
    fn test_skips_busy_offline_and_unlocated() {
        let pickup = GeoPoint::new(13.05, 80.25);
        let mut busy = vehicle("busy", 13.05, 80.25);
        busy.status = VehicleStatus::OnTrip;
        let mut offline = vehicle("offline", 13.05, 80.25);
        offline.status = VehicleStatus::Offline;
        let unlocated = Vehicle::new("nowhere", VehicleClass::Bls, None);
        let idle = vehicle("idle", 13.10, 80.30);

        let picked = select_candidates(vec![busy, offline, unlocated, idle], pickup, 5, None);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].vehicle.plate_no, "idle");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let pickup = GeoPoint::new(13.05, 80.25);
        let vehicles = vec![vehicle("a", 13.06, 80.26), vehicle("b", 13.06, 80.26), vehicle("c", 13.06, 80.26)];
        let plates: Vec<String> = select_candidates(vehicles, pickup, 5, None)
            .into_iter()
            .map(|c| c.vehicle.plate_no)
            .collect();
        assert_eq!(plates, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_class_filter_and_empty_input() {
        let pickup = GeoPoint::new(13.05, 80.25);
        assert!(select_candidates(Vec::new(), pickup, 5, None).is_empty());

        let als = Vehicle::new("als", VehicleClass::Als, Some(GeoPoint::new(13.06, 80.26)));
        let bls = vehicle("bls", 13.05, 80.25);
        let picked = select_candidates(vec![bls, als], pickup, 5, Some(VehicleClass::Als));
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].vehicle.class, VehicleClass::Als);
    }
}
