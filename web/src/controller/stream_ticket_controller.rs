use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::params::ticket::CreateTicketParams;
use crate::{AppState, Error};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use service::config::ApiVersion;

/// POST create a short-lived stream ticket for the authenticated caller.
///
/// Tickets carry the credential for the SSE endpoints, whose transports
/// cannot send an `Authorization` header. The response is
/// `{ticket, expiresInSeconds, ticketId}`.
#[utoipa::path(
    post,
    path = "/sse/stream-ticket",
    params(ApiVersion),
    responses(
        (status = 200, description = "Successfully issued a stream ticket"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub(crate) async fn create(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
    params: Option<Json<CreateTicketParams>>,
) -> Result<impl IntoResponse, Error> {
    let params = params.map(|Json(params)| params).unwrap_or_default();
    debug!(
        "POST create stream ticket for user {user_id}, requested ttl {:?}",
        params.ttl_seconds
    );

    let issued = app_state
        .ticket_authority
        .create_ticket(&user_id, params.ttl_seconds, params.purpose)
        .await?;

    Ok(Json(issued))
}
