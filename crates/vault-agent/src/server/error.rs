//! Conversion of layer errors into HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorResponse;
use common::ServiceError;
use tracing::error;

use crate::crypto::CryptoError;
use crate::rotation::RotationError;
use crate::session::SessionError;

/// Handler error: a [`ServiceError`] rendered as `{code, message}`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "request failed");
        }
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        Self(match e {
            CryptoError::InvalidKeyMaterial => {
                ServiceError::BadRequest("passphrase must not be empty".into())
            }
            CryptoError::DecryptionFailed => ServiceError::DecryptionFailed,
            CryptoError::Serialization | CryptoError::EncryptionFailed => {
                ServiceError::Internal(e.to_string())
            }
        })
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NoActivePassphrase => Self(ServiceError::NoActivePassphrase),
            SessionError::RotationInProgress => Self(ServiceError::RotationInProgress),
            SessionError::Crypto(c) => c.into(),
            // The io error may carry a path; keep it in the logs only.
            SessionError::Persistence(io) => {
                error!(error = %io, "passphrase store failure");
                Self(ServiceError::Internal("passphrase store failure".into()))
            }
        }
    }
}

impl From<RotationError> for ApiError {
    fn from(e: RotationError) -> Self {
        match e {
            RotationError::InvalidRequest(reason) => {
                Self(ServiceError::BadRequest(reason.into()))
            }
            RotationError::Session(s) => s.into(),
            RotationError::Aborted => {
                Self(ServiceError::Internal("rotation task did not complete".into()))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::BadRequest(rejection.body_text()))
    }
}
