use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use semver::Version;
use service::AppState;

static X_VERSION: &str = "x-version";

/// Requires the `x-version` request header to name the API version this
/// deployment exposes. JSON endpoints only; `EventSource` cannot send custom
/// headers, so the stream endpoints are exempt.
pub(crate) struct CompareApiVersion(pub Version);

#[async_trait]
impl FromRequestParts<AppState> for CompareApiVersion {
    type Rejection = RejectionType;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(X_VERSION)
            .and_then(|value| value.to_str().ok())
            .ok_or((
                StatusCode::BAD_REQUEST,
                format!("Missing {X_VERSION} header"),
            ))?;

        let version = header.parse::<Version>().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid {X_VERSION} header value"),
            )
        })?;

        let expected = state
            .config
            .api_version()
            .parse::<Version>()
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Invalid configured API version".to_string(),
                )
            })?;

        if version != expected {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unsupported API version {version}"),
            ));
        }

        Ok(CompareApiVersion(version))
    }
}
