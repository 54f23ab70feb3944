use uyir_shared::BookingStatus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("booking is already {0}")]
    Terminal(BookingStatus),

    #[error("invalid state transition from {from} to {to}")]
    Illegal {
        from: BookingStatus,
        to: BookingStatus,
    },
}

/// Lifecycle rules:
///
/// `REQUESTED → ACCEPTED → ENROUTE → AT_PICKUP → TO_HOSPITAL → COMPLETED`, one
/// step at a time, with `CANCELED` reachable from every non-terminal state.
/// Nothing leaves `COMPLETED` or `CANCELED`.
pub fn validate_transition(from: BookingStatus, to: BookingStatus) -> Result<(), TransitionError> {
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }

    if to == BookingStatus::Canceled || from.next() == Some(to) {
        Ok(())
    } else {
        Err(TransitionError::Illegal { from, to })
    }
}
