use config::Config;
use domain::device::DeviceRegistry;
use domain::gateway::device_registry::HttpDeviceRegistry;
use domain::ticket::TicketAuthority;
use domain::ticket_store::{InMemoryTicketStore, TicketStore};
use events::EventRouter;
use sse::{HeartbeatEmitter, Manager};
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state wiring the shared collaborators together.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<Manager>,
    pub event_router: EventRouter,
    pub ticket_authority: Arc<TicketAuthority>,
    pub device_registry: Arc<dyn DeviceRegistry>,
    pub heartbeat: HeartbeatEmitter,
}

impl AppState {
    /// Production wiring: HTTP device registry and in-process ticket store,
    /// everything else sized from the config.
    pub fn new(config: Config) -> Self {
        let device_registry = Arc::new(HttpDeviceRegistry::new(
            config.device_registry_base_url(),
            config.device_registry_api_key(),
        ));
        let ticket_store = Arc::new(InMemoryTicketStore::new());
        Self::with_collaborators(config, device_registry, ticket_store)
    }

    /// Wiring with explicit collaborators, used by tests to substitute the
    /// device registry or the ticket store.
    pub fn with_collaborators(
        config: Config,
        device_registry: Arc<dyn DeviceRegistry>,
        ticket_store: Arc<dyn TicketStore>,
    ) -> Self {
        let ticket_authority = Arc::new(TicketAuthority::new(
            config.ticket_signing_key(),
            config.ticket_default_ttl_secs,
            config.ticket_min_ttl_secs,
            config.ticket_max_ttl_secs,
            ticket_store,
        ));

        Self {
            sse_manager: Arc::new(Manager::new(config.ip_connection_limit)),
            event_router: EventRouter::new(config.event_buffer_size),
            ticket_authority,
            device_registry,
            heartbeat: HeartbeatEmitter::new(config.heartbeat_interval_secs),
            config,
        }
    }
}
