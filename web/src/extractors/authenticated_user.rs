use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use log::*;
use service::AppState;

/// Extracts the caller's user id from a verified `Authorization: Bearer`
/// header. This is the thin global gate: endpoints that need a
/// bearer-established identity (ticket issuing, status) use this extractor,
/// while the stream endpoints resolve tickets themselves.
pub(crate) struct AuthenticatedUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RejectionType;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))?;

        match state.ticket_authority.decode_bearer(header) {
            Ok(user_id) => Ok(AuthenticatedUser(user_id)),
            Err(e) => {
                debug!("rejecting bearer credential: {e}");
                Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
            }
        }
    }
}
