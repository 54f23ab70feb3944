pub mod error;
pub mod hub;

pub use error::{TrackingError, TrackingResult};
pub use hub::{TrackSnapshot, TrackingHub};
