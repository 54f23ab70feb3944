pub mod models;

pub use models::{
    Booking, BookingStatus, Driver, GeoPoint, Hospital, Offer, OfferStatus, Ping, TrackingEvent,
    Vehicle, VehicleClass, VehicleStatus,
};
