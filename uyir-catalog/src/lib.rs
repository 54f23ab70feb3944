pub mod fare;
pub mod fleet;
pub mod hospital;

pub use fare::{FareCalculator, FareConfig};
pub use fleet::{rank_by_distance, RankedVehicle};
pub use hospital::{search_hospitals, HospitalListing, HospitalQuery};
