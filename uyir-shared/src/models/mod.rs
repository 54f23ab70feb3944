pub mod booking;
pub mod events;
pub mod fleet;
pub mod geo;
pub mod offer;
pub mod ping;

pub use booking::{Booking, BookingStatus, ParseStatusError};
pub use events::TrackingEvent;
pub use fleet::{Driver, Hospital, Vehicle, VehicleClass, VehicleStatus};
pub use geo::GeoPoint;
pub use offer::{Offer, OfferStatus};
pub use ping::Ping;
