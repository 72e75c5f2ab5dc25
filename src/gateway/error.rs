//! Gateway failure taxonomy and its HTTP rendering.
//!
//! Variants stay distinct for logs; the client only ever sees the generic
//! text from [`GatewayError::client_message`].

use axum::{
    http::{HeaderValue, StatusCode, header::X_CONTENT_TYPE_OPTIONS},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::store::StoreError;

const MSG_UNKNOWN_ORIGIN: &str = "unknown origin";
const MSG_MALFORMED_AUTH: &str = "malformed authorization header";
const MSG_ORIGIN_BLOCKED: &str = "origin blocked";
const MSG_BAD_CREDENTIALS: &str = "bad user credentials";
const MSG_INTERNAL: &str = "internal server error";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request origin could not be resolved")]
    UnresolvedOrigin,
    #[error("no basic credentials supplied")]
    MissingCredentials,
    #[error("credential payload is not valid base64 text")]
    MalformedEncoding,
    #[error("credential payload is not a user:password pair")]
    MalformedCredentialPair,
    #[error("credential fields failed syntax checks")]
    InvalidCredentialFormat,
    #[error("origin is blocked after repeated failures")]
    OriginBlocked,
    #[error("no such user")]
    UnknownUser,
    #[error("password mismatch")]
    BadPassword,
    #[error("user lookup failed: {0}")]
    LookupError(#[source] StoreError),
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnresolvedOrigin
            | Self::MissingCredentials
            | Self::MalformedEncoding
            | Self::MalformedCredentialPair
            | Self::InvalidCredentialFormat => StatusCode::BAD_REQUEST,
            Self::OriginBlocked | Self::UnknownUser | Self::BadPassword => StatusCode::FORBIDDEN,
            Self::LookupError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::UnresolvedOrigin => MSG_UNKNOWN_ORIGIN,
            Self::MissingCredentials
            | Self::MalformedEncoding
            | Self::MalformedCredentialPair
            | Self::InvalidCredentialFormat => MSG_MALFORMED_AUTH,
            Self::OriginBlocked => MSG_ORIGIN_BLOCKED,
            Self::UnknownUser | Self::BadPassword => MSG_BAD_CREDENTIALS,
            Self::LookupError(_) => MSG_INTERNAL,
        }
    }

    /// Only a failed verification of well-formed credentials counts as a guess.
    #[must_use]
    pub fn counts_as_attempt(&self) -> bool {
        matches!(self, Self::UnknownUser | Self::BadPassword)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.client_message())
    }
}

/// `{"error": message}` with `nosniff`, the shape of every failure the service returns.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let mut response = (status, Json(json!({ "error": message }))).into_response();
    response
        .headers_mut()
        .insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
