use crate::controller::{
    health_check_controller, stream_status_controller, stream_ticket_controller,
};
use crate::streams::handler;
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here. The two
// stream endpoints are plain SSE and are not part of the OpenAPI surface.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Telemetry Stream API"
        ),
        paths(
            stream_ticket_controller::create,
            stream_status_controller::status,
            health_check_controller::health_check,
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "telemetry_stream", description = "Live machine telemetry streaming API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our bearer token based authentication requirement for gaining
// access to our API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "authorization",
                    "Bearer token issued by the platform's identity service",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(ticket_routes(app_state.clone()))
        .merge(stream_routes(app_state.clone()))
        .merge(status_routes(app_state))
        .merge(health_routes())
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn ticket_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse/stream-ticket", post(stream_ticket_controller::create))
        .with_state(app_state)
}

// The long-lived SSE endpoints. Credentials arrive as query parameters
// because EventSource cannot set request headers.
fn stream_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse/alerts", get(handler::alerts_stream))
        .route("/sse/stream", get(handler::data_stream))
        .with_state(app_state)
}

fn status_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse/status", get(stream_status_controller::status))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use domain::ticket_store::InMemoryTicketStore;
    use domain::timestamp;
    use service::config::Config;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let device_registry = Arc::new(domain::gateway::device_registry::HttpDeviceRegistry::new(
            "http://localhost:1",
            None,
        ));
        AppState::with_collaborators(
            Config::default(),
            device_registry,
            Arc::new(InMemoryTicketStore::new()),
        )
    }

    fn bearer(user_id: &str) -> String {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &serde_json::json!({
                "sub": user_id,
                "exp": timestamp::epoch_seconds() + 300,
            }),
            &jsonwebtoken::EncodingKey::from_secret(b"insecure-dev-signing-key"),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    fn request(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-version", "1.0.0-beta1")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        if let Some(authorization) = authorization {
            builder = builder.header("authorization", authorization);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_needs_no_credential() -> Result<()> {
        let response = define_routes(test_state())
            .oneshot(request("GET", "/health", None))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_ticket_issuance_requires_a_bearer_identity() -> Result<()> {
        let router = define_routes(test_state());

        let response = router
            .clone()
            .oneshot(request("POST", "/sse/stream-ticket", None))
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(request(
                "POST",
                "/sse/stream-ticket",
                Some(&bearer("user-1")),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_issued_ticket_body_shape() -> Result<()> {
        use http_body_util::BodyExt;

        let response = define_routes(test_state())
            .oneshot(request(
                "POST",
                "/sse/stream-ticket",
                Some(&bearer("user-1")),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_slice(&response.into_body().collect().await?.to_bytes())?;
        assert!(body["ticket"].is_string());
        assert!(body["ticketId"].is_string());
        assert_eq!(body["expiresInSeconds"], 300);
        Ok(())
    }

    #[tokio::test]
    async fn test_status_reports_the_callers_connections() -> Result<()> {
        use http_body_util::BodyExt;

        let state = test_state();
        state
            .sse_manager
            .try_register_connection(
                std::net::IpAddr::from([10, 0, 0, 1]),
                "user-1".to_string(),
                domain::ticket::Purpose::Alerts,
                vec![],
            )
            .unwrap();

        let response = define_routes(state)
            .oneshot(request("GET", "/sse/status", Some(&bearer("user-1"))))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_slice(&response.into_body().collect().await?.to_bytes())?;
        assert_eq!(body["data"]["user"]["alerts"], 1);
        assert_eq!(body["data"]["totalConnections"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_json_endpoints_require_the_version_header() -> Result<()> {
        let request = Request::builder()
            .method("POST")
            .uri("/sse/stream-ticket")
            .header("authorization", bearer("user-1"))
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
            .body(Body::empty())?;

        let response = define_routes(test_state()).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
