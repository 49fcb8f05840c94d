use crate::params::stream::{device_selector, AlertStreamParams, DataStreamParams};
use crate::{AppState, Error};
use async_stream::stream;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domain::error::{Error as DomainError, StreamErrorKind};
use domain::ticket::{Credentials, Purpose};
use events::{EventKind, StreamEvent, Subscription};
use futures::Stream;
use log::*;
use serde_json::json;
use sse::{ConnectionId, HeartbeatEmitter, Manager};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Unregisters its connection when dropped. Moved into the delivery stream
/// so cleanup runs however the stream ends: normal close, router shutdown,
/// or the client dropping the transport while the stream is parked on an
/// await.
struct CleanupGuard {
    manager: Arc<Manager>,
    connection_id: ConnectionId,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        debug!(
            "stream connection {} closed, cleaning up",
            self.connection_id.as_str()
        );
        self.manager.unregister_connection(&self.connection_id);
    }
}

/// GET handler for the alerts stream. Delivers machine alerts, alarm updates
/// and system events for the authenticated caller, unscoped by device.
pub(crate) async fn alerts_stream(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<AlertStreamParams>,
) -> Result<Response, Error> {
    let identity = app_state
        .ticket_authority
        .resolve_identity(Credentials {
            ticket: params.ticket.as_deref(),
            authorization_header: authorization_header(&headers),
            required_purpose: Some(Purpose::Alerts),
        })
        .await?;

    let ip = client_ip(&headers, addr);
    let Some(connection_id) = app_state.sse_manager.try_register_connection(
        ip,
        identity.user_id.clone(),
        Purpose::Alerts,
        vec![],
    ) else {
        return Ok(rate_limited(&app_state, &identity.user_id));
    };

    debug!("establishing alerts stream for user {}", identity.user_id);
    let cleanup = CleanupGuard {
        manager: app_state.sse_manager.clone(),
        connection_id,
    };

    let subscription = app_state.event_router.alert_projection();
    Ok(deliver(&app_state, cleanup, subscription, vec![]).into_response())
}

/// GET handler for the device-scoped data stream. Validates the device
/// selection, confirms the caller owns every requested device, then delivers
/// telemetry, SPC and status events for exactly those devices.
pub(crate) async fn data_stream(
    State(app_state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<DataStreamParams>,
) -> Result<Response, Error> {
    let devices = device_selector(params.device_id.as_deref(), params.device_ids.as_deref());
    if devices.is_empty() {
        return Err(DomainError::stream(StreamErrorKind::MissingDeviceSelector).into());
    }
    let limit = app_state.config.max_devices_per_connection;
    if devices.len() > limit {
        return Err(DomainError::stream(StreamErrorKind::TooManyDevices {
            requested: devices.len(),
            limit,
        })
        .into());
    }

    let identity = app_state
        .ticket_authority
        .resolve_identity(Credentials {
            ticket: params.ticket.as_deref(),
            authorization_header: authorization_header(&headers),
            required_purpose: Some(Purpose::Data),
        })
        .await?;

    // All-or-nothing ownership: one denied device rejects the whole request.
    for device_id in &devices {
        let owned = app_state
            .device_registry
            .find_owned_device(device_id, &identity.user_id)
            .await?;
        if owned.is_none() {
            warn!(
                "denying data stream for user {}: device {device_id} not owned",
                identity.user_id
            );
            return Err(DomainError::stream(StreamErrorKind::Forbidden).into());
        }
    }

    let ip = client_ip(&headers, addr);
    let Some(connection_id) = app_state.sse_manager.try_register_connection(
        ip,
        identity.user_id.clone(),
        Purpose::Data,
        devices.clone(),
    ) else {
        return Ok(rate_limited(&app_state, &identity.user_id));
    };

    debug!(
        "establishing data stream for user {} on devices {devices:?}",
        identity.user_id
    );
    let cleanup = CleanupGuard {
        manager: app_state.sse_manager.clone(),
        connection_id,
    };

    let subscription = app_state
        .event_router
        .data_projection()
        .scoped_to_devices(devices.iter().cloned().collect());

    // Current status snapshot per device, emitted ahead of the live events.
    // A registry that cannot answer for a device is not fatal to the stream.
    let mut initial = Vec::new();
    if params.include_status.unwrap_or(true) {
        for device_id in &devices {
            match app_state.device_registry.get_device_status(device_id).await {
                Ok(snapshot) => match serde_json::to_value(&snapshot) {
                    Ok(data) => initial.push(StreamEvent::for_device(
                        EventKind::MachineStatus,
                        device_id,
                        data,
                    )),
                    Err(e) => warn!("skipping status snapshot for {device_id}: {e}"),
                },
                Err(e) => warn!("status snapshot unavailable for {device_id}: {e}"),
            }
        }
    }

    Ok(deliver(&app_state, cleanup, subscription, initial).into_response())
}

/// Build the delivery stream for an admitted connection: the initial frames,
/// then live events merged with heartbeat ticks until the subscription or
/// the client goes away.
fn deliver(
    app_state: &AppState,
    cleanup: CleanupGuard,
    mut subscription: Subscription,
    initial: Vec<StreamEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let heartbeat = app_state.heartbeat;

    let stream = stream! {
        let _cleanup = cleanup;

        for event in &initial {
            if let Some(frame) = frame(event) {
                yield Ok::<_, Infallible>(frame);
            }
        }

        let mut ticks = heartbeat.ticks();
        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    if let Some(frame) = frame(&HeartbeatEmitter::event()) {
                        yield Ok(frame);
                    }
                }
                next = subscription.recv() => match next {
                    Some(event) => {
                        if let Some(frame) = frame(&event) {
                            yield Ok(frame);
                        }
                    }
                    None => break,
                },
            }
        }
    };

    Sse::new(stream)
}

/// Render an event as an SSE frame. An unserializable payload is logged and
/// dropped rather than tearing the connection down.
fn frame(event: &StreamEvent) -> Option<Event> {
    match serde_json::to_string(&event.data) {
        Ok(data) => {
            let mut frame = Event::default().event(event.kind.as_str()).data(data);
            if let Some(id) = &event.id {
                frame = frame.id(id);
            }
            Some(frame)
        }
        Err(e) => {
            error!("dropping undeliverable {} event: {e}", event.kind.as_str());
            None
        }
    }
}

fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// The remote IP the quota is keyed on. Behind the reverse proxy the first
/// `x-forwarded-for` entry is the client; the socket address is the fallback
/// for direct connections.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok())
        .unwrap_or_else(|| addr.ip())
}

/// 429 with the caller's registry snapshot attached so clients can see which
/// of their connections hold the quota.
fn rate_limited(app_state: &AppState, user_id: &str) -> Response {
    warn!("refusing stream connection for user {user_id}: IP at its connection quota");
    let snapshot = app_state.sse_manager.snapshot_for(user_id);
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "error": "too many concurrent connections",
            "limit": snapshot.ip_connection_limit,
            "stats": snapshot,
        })),
    )
        .into_response()
}
