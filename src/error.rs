use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Conflict {
        message: String,
        conflict_booking_id: Option<Uuid>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidStateTransition(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("{0}")]
    NoAvailableDriver(String),

    #[error("{0}")]
    ExternalService(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
            conflict_booking_id: None,
        }
    }

    /// Overlapping reservation on the same room.
    pub fn booking_conflict(existing: Uuid) -> Self {
        AppError::Conflict {
            message: format!("Room is already booked for these dates (booking {})", existing),
            conflict_booking_id: Some(existing),
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Conflict { .. } => "ConflictError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::InvalidStateTransition(_) => "InvalidStateTransition",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "AuthorizationError",
            AppError::PaymentRequired(_) => "PaymentRequired",
            AppError::NoAvailableDriver(_) => "NoAvailableDriver",
            AppError::ExternalService(_) => "ExternalServiceError",
            AppError::Database(_) | AppError::Internal(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidStateTransition(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } | AppError::NoAvailableDriver(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the logs
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal server error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": self.kind(),
            "message": message,
        });

        if let AppError::Conflict {
            conflict_booking_id: Some(id),
            ..
        } = &self
        {
            body["conflictBookingId"] = json!(id);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_status_codes() {
        let err = AppError::InvalidStateTransition("nope".to_string());
        assert_eq!(err.kind(), "InvalidStateTransition");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = AppError::PaymentRequired("unpaid".to_string());
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);

        let err = AppError::Forbidden("not yours".to_string());
        assert_eq!(err.kind(), "AuthorizationError");
    }

    #[test]
    fn test_booking_conflict_carries_id() {
        let id = Uuid::new_v4();
        match AppError::booking_conflict(id) {
            AppError::Conflict {
                conflict_booking_id,
                ..
            } => assert_eq!(conflict_booking_id, Some(id)),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
