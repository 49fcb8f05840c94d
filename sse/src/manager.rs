use crate::connection::{
    ConnectionId, ConnectionRegistry, ConnectionSummary, DeviceId, UserConnectionStats, UserId,
};
use domain::ticket::Purpose;
use log::*;
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Diagnostic view of the registry from one user's perspective. Returned by
/// the status endpoint and attached to rate-limit rejections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    pub user: UserConnectionStats,
    pub connections: Vec<ConnectionSummary>,
    pub total_connections: usize,
    pub device_connections: HashMap<DeviceId, usize>,
    pub user_device_connections: HashMap<DeviceId, usize>,
    pub ip_connection_limit: usize,
}

/// High-level handle on the connection registry. One instance lives in the
/// application state and is shared by every stream handler.
pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new(ip_limit: usize) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(ip_limit)),
        }
    }

    /// Admit and register a new connection, returning its unique ID, or
    /// `None` when the IP is at its open-connection quota.
    pub fn try_register_connection(
        &self,
        ip: IpAddr,
        user_id: UserId,
        purpose: Purpose,
        device_ids: Vec<DeviceId>,
    ) -> Option<ConnectionId> {
        let connection_id = self.registry.try_register(ip, user_id, purpose, device_ids)?;
        info!(
            "Registered new {purpose} stream connection {}",
            connection_id.as_str()
        );
        Some(connection_id)
    }

    /// Unregister a connection by ID
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        self.registry.unregister(connection_id);
    }

    /// Snapshot of the registry as seen by one user.
    pub fn snapshot_for(&self, user_id: &str) -> RegistrySnapshot {
        RegistrySnapshot {
            user: self.registry.user_stats(user_id),
            connections: self.registry.user_connections(user_id),
            total_connections: self.registry.total(),
            device_connections: self.registry.device_counts(),
            user_device_connections: self.registry.user_device_counts(user_id),
            ip_connection_limit: self.registry.ip_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_registrations() {
        let manager = Manager::new(5);
        let ip = IpAddr::from([10, 0, 0, 1]);
        manager
            .try_register_connection(ip, "user-1".to_string(), Purpose::Alerts, vec![])
            .unwrap();
        let data_connection = manager
            .try_register_connection(
                ip,
                "user-1".to_string(),
                Purpose::Data,
                vec!["C02".to_string()],
            )
            .unwrap();

        let snapshot = manager.snapshot_for("user-1");
        assert_eq!(snapshot.user.total, 2);
        assert_eq!(snapshot.total_connections, 2);
        assert_eq!(snapshot.device_connections.get("C02"), Some(&1));
        assert_eq!(snapshot.user_device_connections.get("C02"), Some(&1));
        assert_eq!(snapshot.ip_connection_limit, 5);

        manager.unregister_connection(&data_connection);
        let snapshot = manager.snapshot_for("user-1");
        assert_eq!(snapshot.user.total, 1);
        assert!(snapshot.device_connections.is_empty());
    }
}
