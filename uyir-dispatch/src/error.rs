use uuid::Uuid;
use uyir_booking::BookingError;
use uyir_core::StoreError;
use uyir_shared::BookingStatus;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Offer not found: {0}")]
    OfferNotFound(Uuid),

    #[error("booking {0} was already taken by another ambulance")]
    AlreadyTaken(Uuid),

    #[error("offer {0} has expired")]
    OfferExpired(Uuid),

    #[error("booking {id} is already {status}")]
    BookingTerminal { id: Uuid, status: BookingStatus },

    #[error("vehicle {0} is not available")]
    VehicleUnavailable(Uuid),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
