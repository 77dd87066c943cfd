pub mod devices;
pub mod links;
pub mod topologies;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::booking::BookingError;
use crate::links::LinkError;
use crate::teardown::TeardownError;

/// Error body: {"error": "message"}
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error type
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{} not found", resource),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.into(),
        }
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse::new(self.message)),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Check for typed NotFoundError first (no fragile string matching)
        if let Some(nf) = err.downcast_ref::<crate::db::NotFoundError>() {
            return Self::not_found(&nf.to_string());
        }
        if let Some(conflict) = err.downcast_ref::<crate::db::ConflictError>() {
            return Self::conflict(conflict.to_string());
        }
        Self::internal(err.to_string())
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::DeviceNotFound(id) => Self::not_found(&format!("device {}", id)),
            BookingError::AlreadyBooked(_) => Self::conflict(err.to_string()),
            BookingError::Unauthorized(_) => Self::unauthorized(err.to_string()),
            BookingError::Store(e) => e.into(),
        }
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::ConnectionNotFound { .. }
            | LinkError::InterconnectNotFound(_)
            | LinkError::TopologyNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
            },
            LinkError::InterconnectMisconfigured { .. } | LinkError::InvalidPort(_) => {
                Self::bad_request(err.to_string())
            }
            LinkError::Provisioning(_) => Self::bad_gateway(err.to_string()),
            LinkError::Store(e) => e.into(),
        }
    }
}

impl From<TeardownError> for ApiError {
    fn from(err: TeardownError) -> Self {
        match err {
            TeardownError::TopologyNotFound(id) => Self::not_found(&format!("topology {}", id)),
            TeardownError::Forbidden(_) => Self::forbidden(err.to_string()),
            TeardownError::Link(e) => e.into(),
            TeardownError::Store(e) => e.into(),
        }
    }
}

/// Response helper: return 201 Created with JSON body
pub fn created<T: Serialize>(item: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(item))
}

/// Healthcheck endpoint - returns 200 OK with status
pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "labforge",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConflictError, NotFoundError};

    #[test]
    fn test_error_status_mapping() {
        let err: ApiError = anyhow::Error::from(NotFoundError::new("Device", "3")).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: ApiError = anyhow::Error::from(ConflictError::new("taken")).into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = BookingError::AlreadyBooked("r1".to_string()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError = BookingError::Unauthorized("r1".to_string()).into();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err: ApiError = LinkError::Provisioning("down".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err: ApiError = TeardownError::Forbidden(1).into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
