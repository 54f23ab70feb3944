pub mod arbitrator;
pub mod error;
pub mod expiry;
pub mod locks;
pub mod orchestrator;
pub mod selector;

pub use arbitrator::{AcceptedOffer, OfferArbitrator};
pub use error::{DispatchError, DispatchResult};
pub use expiry::OfferPolicy;
pub use locks::BookingLocks;
pub use orchestrator::{Dispatched, Dispatcher};
pub use selector::{select_candidates, Candidate};
