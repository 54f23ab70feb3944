use serde::Serialize;
use uyir_core::geo::geodesic_distance_km;
use uyir_shared::{GeoPoint, Hospital};

/// Filter for the hospital directory
#[derive(Debug, Clone, Default)]
pub struct HospitalQuery {
    /// Capability tags; a hospital matches when it offers any of them
    pub needs: Vec<String>,
    /// Rank results by distance from this point
    pub near: Option<GeoPoint>,
}

impl HospitalQuery {
    /// Parses the comma-separated `needs` query parameter.
    pub fn parse_needs(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn matches(&self, hospital: &Hospital) -> bool {
        self.needs.is_empty()
            || hospital
                .capabilities
                .iter()
                .any(|cap| self.needs.iter().any(|need| need.eq_ignore_ascii_case(cap)))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HospitalListing {
    #[serde(flatten)]
    pub hospital: Hospital,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

pub fn search_hospitals(hospitals: Vec<Hospital>, query: &HospitalQuery) -> Vec<HospitalListing> {
    let mut listings: Vec<HospitalListing> = hospitals
        .into_iter()
        .filter(|h| query.matches(h))
        .map(|hospital| {
            let distance_km = query.near.map(|p| geodesic_distance_km(p, hospital.location));
            HospitalListing { hospital, distance_km }
        })
        .collect();

    if query.near.is_some() {
        listings.sort_by(|a, b| {
            a.distance_km
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.distance_km.unwrap_or(f64::INFINITY))
        });
    }

    listings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> Vec<Hospital> {
        vec![
            Hospital::new("Apollo Hospital", &["ICU", "NEO", "TRAUMA"], GeoPoint::new(13.0475, 80.2565)),
            Hospital::new("Fortis Malar Hospital", &["ICU", "CARDIO"], GeoPoint::new(13.0569, 80.2481)),
            Hospital::new("SRM Hospital", &["TRAUMA"], GeoPoint::new(12.8230, 80.0459)),
        ]
    }

    #[test]
    fn test_needs_any_match() {
        let query = HospitalQuery {
            needs: HospitalQuery::parse_needs("cardio, ,NEO"),
            near: None,
        };
        let names: Vec<String> = search_hospitals(directory(), &query)
            .into_iter()
            .map(|l| l.hospital.name)
            .collect();

        assert_eq!(names, vec!["Apollo Hospital", "Fortis Malar Hospital"]);
    }

    #[test]
    fn test_no_filter_returns_all_in_store_order() {
        let listings = search_hospitals(directory(), &HospitalQuery::default());
        assert_eq!(listings.len(), 3);
        assert!(listings.iter().all(|l| l.distance_km.is_none()));
    }

    #[test]
    fn test_near_ranks_by_distance() {
        let query = HospitalQuery {
            needs: vec![],
            near: Some(GeoPoint::new(12.83, 80.05)),
        };
        let listings = search_hospitals(directory(), &query);
        assert_eq!(listings[0].hospital.name, "SRM Hospital");
    }
}
