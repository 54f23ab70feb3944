use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uyir_booking::BookingError;
use uyir_core::StoreError;
use uyir_dispatch::DispatchError;
use uyir_tracking::TrackingError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    GoneError(String),
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
            AppError::ConflictError(_) => StatusCode::CONFLICT,
            AppError::GoneError(_) => StatusCode::GONE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFoundError(msg)
            | AppError::ConflictError(msg)
            | AppError::GoneError(msg) => msg.clone(),
            AppError::InternalServerError(_) => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::InternalServerError(msg) = &self {
            tracing::error!("Internal Server Error: {}", msg);
        }

        let body = Json(json!({
            "error": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

/// JSON body extractor whose rejections use the API error shape
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(_) | BookingError::InvalidStatus(_) => {
                AppError::ValidationError(err.to_string())
            }
            BookingError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            BookingError::Terminal { .. } => AppError::ConflictError(err.to_string()),
            BookingError::Store(e) => e.into(),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::OfferNotFound(_) => AppError::NotFoundError(err.to_string()),
            DispatchError::AlreadyTaken(_)
            | DispatchError::BookingTerminal { .. }
            | DispatchError::VehicleUnavailable(_) => AppError::ConflictError(err.to_string()),
            DispatchError::OfferExpired(_) => AppError::GoneError(err.to_string()),
            DispatchError::Booking(e) => e.into(),
            DispatchError::Store(e) => e.into(),
        }
    }
}

impl From<TrackingError> for AppError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::Booking(e) => e.into(),
            TrackingError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use uyir_shared::BookingStatus;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        let cases: Vec<(AppError, StatusCode)> = vec![
            (BookingError::Validation("bad".into()).into(), StatusCode::BAD_REQUEST),
            (BookingError::InvalidStatus("nope".into()).into(), StatusCode::BAD_REQUEST),
            (BookingError::NotFound(id).into(), StatusCode::NOT_FOUND),
            (BookingError::Terminal { id, status: BookingStatus::Completed }.into(), StatusCode::CONFLICT),
            (DispatchError::OfferNotFound(id).into(), StatusCode::NOT_FOUND),
            (DispatchError::AlreadyTaken(id).into(), StatusCode::CONFLICT),
            (DispatchError::OfferExpired(id).into(), StatusCode::GONE),
            (DispatchError::Store(StoreError::Database("down".into())).into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err:?}");
        }
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err: AppError = StoreError::Database("password=hunter2".into()).into();
        assert_eq!(err.public_message(), "Internal Server Error");
    }
}
