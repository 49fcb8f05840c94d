use crate::controller::ApiResponse;
use crate::extractors::{
    authenticated_user::AuthenticatedUser, compare_api_version::CompareApiVersion,
};
use crate::{AppState, Error};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use service::config::ApiVersion;

/// GET a diagnostic snapshot of the caller's live stream connections.
#[utoipa::path(
    get,
    path = "/sse/status",
    params(ApiVersion),
    responses(
        (status = 200, description = "Successfully retrieved stream connection status"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub(crate) async fn status(
    CompareApiVersion(_v): CompareApiVersion,
    AuthenticatedUser(user_id): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    debug!("GET stream connection status for user {user_id}");

    let snapshot = app_state.sse_manager.snapshot_for(&user_id);

    Ok(Json(ApiResponse::new(200, snapshot)))
}
