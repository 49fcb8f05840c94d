//! Stream connection orchestration.
//!
//! This module contains only the Axum handlers for the live stream endpoints.
//! They carry out the admission sequence for a request: resolve the
//! credential, validate the device selection, confirm ownership, apply the
//! per-IP quota, register the connection and only then start delivering
//! frames. The registry and the event fan-out live in the `sse` and `events`
//! crates to avoid circular dependencies.

pub mod handler;
