//! JSON error responses.
//!
//! Every handler failure becomes an [`ApiError`], which wraps the
//! transport-neutral [`InterfaceError`] and renders it as
//! `{"error": <code>, "message": <text>, "correlation_id": <id>}`. 5xx bodies
//! carry a generic message; the underlying detail is only logged.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use hcplog_core::errors::{ApplicationError, InterfaceError};

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    pub fn from_application(error: impl Into<ApplicationError>, correlation_id: &str) -> Self {
        Self(error.into().into_interface(correlation_id))
    }

    /// Body could not be decoded. Well-formed JSON of the wrong shape is 422.
    pub fn rejected(rejection: JsonRejection, correlation_id: &str) -> Self {
        let message = rejection.body_text();
        let correlation_id = correlation_id.to_string();
        match rejection {
            JsonRejection::JsonDataError(_) => {
                Self(InterfaceError::Unprocessable { message, correlation_id })
            }
            _ => Self(InterfaceError::BadRequest { message, correlation_id }),
        }
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            InterfaceError::BadRequest { .. } => "bad_request",
            InterfaceError::NotFound { .. } => "not_found",
            InterfaceError::Unprocessable { .. } => "unprocessable_entity",
            InterfaceError::BadGateway { .. } => "bad_gateway",
            InterfaceError::Internal { .. } => "internal_error",
        }
    }
}

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "http.request.failed",
                correlation_id = self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "http.request.rejected",
                correlation_id = self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.0.public_detail(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
