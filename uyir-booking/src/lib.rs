pub mod code;
pub mod error;
pub mod machine;
pub mod manager;

pub use error::{BookingError, BookingResult};
pub use machine::{validate_transition, TransitionError};
pub use manager::{BookingManager, NewBooking};
