//! HTTP clients for external collaborators.

pub mod device_registry;
