//! Event distribution infrastructure for the telemetry streaming layer.
//!
//! This crate provides the in-process event model and the broadcast router
//! that fans telemetry and alert events out to stream subscribers.
//!
//! # Architecture
//!
//! - **StreamEvent**: the single event shape delivered to stream clients
//! - **EventRouter**: one-publisher/N-subscriber broadcast with no replay
//! - **Projection / DeviceFilter**: per-subscriber filter predicates
//! - **ingest**: translates the three fixed upstream channels into events
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies. Event payloads are carried as `serde_json::Value`s.

pub mod event;
pub mod ingest;
pub mod router;

pub use event::{EventKind, StreamEvent};
pub use ingest::{UpstreamReceivers, UpstreamSenders};
pub use router::{EventRouter, Projection, Subscription};
