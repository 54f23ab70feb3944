use uuid::Uuid;
use uyir_core::{CoreError, StoreError};

use crate::machine::TransitionError;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("booking {id} is already {status}")]
    Terminal {
        id: Uuid,
        status: uyir_shared::BookingStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CoreError> for BookingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => BookingError::Validation(msg),
            CoreError::InternalError(e) => BookingError::Store(e),
        }
    }
}

impl BookingError {
    pub(crate) fn from_transition(id: Uuid, err: TransitionError) -> Self {
        match err {
            TransitionError::Terminal(status) => BookingError::Terminal { id, status },
            illegal @ TransitionError::Illegal { .. } => BookingError::InvalidStatus(illegal.to_string()),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
