//! Demo fleet and hospitals around Chennai.

use tracing::info;
use uyir_core::repository::{RecordStore, StoreResult};
use uyir_shared::{Driver, GeoPoint, Hospital, Vehicle, VehicleClass, VehicleStatus};

const CENTERS: [(f64, f64); 6] = [
    (13.0827, 80.2707),
    (13.05, 80.25),
    (13.09, 80.29),
    (13.07, 80.24),
    (13.1, 80.28),
    (13.06, 80.26),
];

const CLASSES: [VehicleClass; 3] = [VehicleClass::Bls, VehicleClass::Als, VehicleClass::Neo];

const HOSPITALS: [(&str, &[&str], f64, f64); 8] = [
    ("Apollo Hospital", &["ICU", "NEO", "TRAUMA"], 13.0475, 80.2565),
    ("Fortis Malar Hospital", &["ICU", "CARDIO"], 13.0569, 80.2481),
    ("MIOT International", &["TRAUMA", "NEO"], 13.0332, 80.2358),
    ("Stanley Medical College", &["TRAUMA", "ICU"], 13.0978, 80.2860),
    ("Government Royapettah", &["ICU", "TRAUMA"], 13.0589, 80.2691),
    ("Kauvery Hospital", &["ICU"], 13.0442, 80.2525),
    ("SRM Hospital", &["TRAUMA"], 12.8230, 80.0459),
    ("Global Hospitals", &["ICU", "NEO"], 13.0108, 80.2182),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub vehicles: usize,
    pub drivers: usize,
    pub hospitals: usize,
}

/// Six ambulances with their drivers (every other one offline) and eight
/// hospitals. Intended for an empty store.
pub async fn seed_demo_data(store: &dyn RecordStore) -> StoreResult<SeedSummary> {
    for (i, (lat, lng)) in CENTERS.iter().enumerate() {
        let offset = (i as f64 - 2.0) * 0.01;
        let online = i % 2 == 0;
        let driver_id = format!("d{}", i + 1);

        let mut vehicle = Vehicle::new(
            format!("TN{:02}AB{}", i + 1, i * 3 + 1234),
            CLASSES[i % CLASSES.len()],
            Some(GeoPoint::new(lat + offset, lng + offset)),
        );
        vehicle.status = if online { VehicleStatus::Idle } else { VehicleStatus::Offline };
        vehicle.driver_id = Some(driver_id.clone());
        store.insert_vehicle(&vehicle).await?;

        let driver = Driver {
            id: driver_id,
            name: format!("Driver {}", i + 1),
            phone: None,
            rating: 4.2 + i as f64 * 0.1,
            online,
            vehicle_id: Some(vehicle.id),
        };
        store.insert_driver(&driver).await?;
    }

    for (name, capabilities, lat, lng) in HOSPITALS {
        store
            .insert_hospital(&Hospital::new(name, capabilities, GeoPoint::new(lat, lng)))
            .await?;
    }

    let summary = SeedSummary {
        vehicles: CENTERS.len(),
        drivers: CENTERS.len(),
        hospitals: HOSPITALS.len(),
    };
    info!(?summary, "Seeded demo data");
    Ok(summary)
}
