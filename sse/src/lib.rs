//! Server-Sent Events (SSE) infrastructure for live telemetry streams.
//!
//! This crate tracks every open stream connection and supplies the periodic
//! keepalive merged into each one. Event payloads and fan-out live in the
//! `events` crate; the HTTP handlers that wire the two together live in `web`.
//!
//! # Architecture
//!
//! - **Per-IP admission control**: a fixed quota of simultaneously open
//!   connections per remote IP, enforced atomically at registration so
//!   racing requests cannot overshoot the limit.
//! - **Triple-index registry**: O(1) lookup by connection id for cleanup,
//!   plus derived IP-count and device-subscriber indices that stay exactly
//!   reconstructible from the live connection set.
//! - **Deterministic cleanup**: `unregister` is idempotent and is invoked on
//!   every disconnect path by the connection orchestrator in `web`.
//! - **Heartbeat**: every connection merges a periodic keepalive tick,
//!   independent of upstream activity.
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with IP quota and device indices
//! - `manager`: shared registry handle and diagnostic snapshots
//! - `heartbeat`: the keepalive emitter

pub mod connection;
pub mod heartbeat;
pub mod manager;

pub use connection::{ConnectionId, ConnectionRegistry};
pub use heartbeat::HeartbeatEmitter;
pub use manager::{Manager, RegistrySnapshot};
