//! The device registry collaborator boundary.
//!
//! Device ownership and status live in a separate service; this layer only
//! needs two questions answered: does this user own this device, and what is
//! the device's current status. The HTTP implementation lives in
//! [`crate::gateway::device_registry`].

use crate::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A device as the registry describes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
}

/// A point-in-time status snapshot for a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub device_id: String,
    pub status: Value,
    #[serde(default)]
    pub captured_at: Option<String>,
}

/// External collaborator answering device ownership and status questions.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Look up a device owned by `user_id`. `Ok(None)` means the device does
    /// not exist or is not owned by that user; the two cases are not
    /// distinguished.
    async fn find_owned_device(
        &self,
        device_id: &str,
        user_id: &str,
    ) -> Result<Option<Device>, Error>;

    /// Fetch the current status snapshot for a device.
    async fn get_device_status(&self, device_id: &str) -> Result<StatusSnapshot, Error>;
}
