use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{
    AuthErrorKind, DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    StreamErrorKind,
};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(pub(crate) DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

fn body(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

// Guard-stage failures surface synchronously with a structured JSON body and
// never register the connection. Rate-limit rejections carry a diagnostic
// snapshot and are built directly by the stream handlers, not through this
// mapping.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Auth(auth_error_kind) => match auth_error_kind {
                AuthErrorKind::Unauthenticated => {
                    body(StatusCode::UNAUTHORIZED, "authentication required")
                }
                AuthErrorKind::InvalidCredential => {
                    body(StatusCode::UNAUTHORIZED, "invalid credential")
                }
                AuthErrorKind::TicketExpired => body(StatusCode::UNAUTHORIZED, "ticket expired"),
                AuthErrorKind::PurposeMismatch => body(
                    StatusCode::FORBIDDEN,
                    "ticket purpose does not allow this stream",
                ),
            },
            DomainErrorKind::Stream(stream_error_kind) => match stream_error_kind {
                StreamErrorKind::Forbidden => {
                    body(StatusCode::FORBIDDEN, "device ownership denied")
                }
                StreamErrorKind::MissingDeviceSelector => body(
                    StatusCode::BAD_REQUEST,
                    "at least one deviceId is required",
                ),
                StreamErrorKind::TooManyDevices { requested, limit } => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "too many devices requested",
                        "requested": requested,
                        "limit": limit,
                    })),
                )
                    .into_response(),
            },
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                }
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Network => body(StatusCode::BAD_GATEWAY, "bad gateway"),
                ExternalErrorKind::Other(_) => {
                    body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
