//! HTTP surface of the telemetry streaming backend.
//!
//! Thin axum layer over the domain: controllers validate input, resolve the
//! caller's identity through the ticket authority, and hand accepted stream
//! requests to the connection orchestrator in [`streams`].

mod controller;
mod error;
mod extractors;
mod params;
pub mod router;
mod streams;

pub use error::{Error, Result};
pub use service::AppState;
