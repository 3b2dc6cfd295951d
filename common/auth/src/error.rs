use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::codec::VerificationError;
use crate::roles::Role;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingToken,
    #[error("authorization header malformed")]
    MalformedAuthorization,
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("role '{actual}' does not satisfy required role '{required}'")]
    InsufficientRole { required: Role, actual: Role },
    #[error("shop '{0}' no longer exists")]
    UnknownShop(Uuid),
    #[error("shop directory unavailable: {0}")]
    Store(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    /// Collapses every failure to a generic 401/403 body. The specific
    /// variant is logged but never surfaced, so a caller cannot distinguish
    /// an expired token from a forged one.
    fn into_response(self) -> Response {
        debug!(error = %self, "request rejected by auth layer");
        let (status, code) = match &self {
            AuthError::InsufficientRole { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            _ => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        };
        let body = ErrorBody {
            code,
            message: "invalid or missing credentials",
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_collapse_to_401() {
        for err in [
            AuthError::MissingToken,
            AuthError::MalformedAuthorization,
            AuthError::Verification(VerificationError::Expired),
            AuthError::Verification(VerificationError::BadSignature),
            AuthError::UnknownShop(Uuid::new_v4()),
            AuthError::Store("timeout".into()),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn insufficient_role_is_403() {
        let err = AuthError::InsufficientRole {
            required: Role::Admin,
            actual: Role::User,
        };
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}
