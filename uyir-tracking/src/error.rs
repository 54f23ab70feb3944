use uyir_booking::BookingError;
use uyir_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TrackingResult<T> = Result<T, TrackingError>;
