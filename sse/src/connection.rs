use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domain::ticket::Purpose;
use log::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

// Type aliases for the registry's key spaces
pub type UserId = String;
pub type DeviceId = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A live stream connection's record. Created when a request is admitted,
/// destroyed exactly once on disconnect.
#[derive(Debug, Clone)]
pub struct StreamConnection {
    pub ip: IpAddr,
    pub user_id: UserId,
    pub purpose: Purpose,
    /// Devices this connection is scoped to. Empty for alert streams.
    pub device_ids: Vec<DeviceId>,
    pub connected_at: DateTime<Utc>,
}

/// Per-user open-connection counts, split by purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserConnectionStats {
    pub alerts: usize,
    pub data: usize,
    pub total: usize,
}

/// A user-facing view of one open connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub connection_id: String,
    pub purpose: Purpose,
    pub device_ids: Vec<DeviceId>,
    pub connected_at: DateTime<Utc>,
}

/// Connection registry with per-IP quota tracking and a device subscriber
/// index for data-purpose connections.
///
/// The IP counter map and the device index are derived state: they are only
/// ever mutated by `register`/`unregister` and stay exactly reconstructible
/// from the live connection set.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, StreamConnection>,

    /// Open-connection count per remote IP, used for admission control
    ip_counts: DashMap<IpAddr, usize>,

    /// Secondary index: device id -> subscribing connection ids (data purpose only)
    device_index: DashMap<DeviceId, HashSet<ConnectionId>>,

    /// Maximum simultaneously open connections per IP
    ip_limit: usize,
}

impl ConnectionRegistry {
    pub fn new(ip_limit: usize) -> Self {
        Self {
            connections: DashMap::new(),
            ip_counts: DashMap::new(),
            device_index: DashMap::new(),
            ip_limit,
        }
    }

    pub fn ip_limit(&self) -> usize {
        self.ip_limit
    }

    /// Admit and register a new connection, or `None` when the IP is at its
    /// quota. The check and the counter increment happen under one entry
    /// guard, so concurrent requests from the same IP cannot both slip past
    /// the limit. Only the per-IP cap is enforced; per-user and per-device
    /// counts are surfaced in rejection diagnostics but carry no quota of
    /// their own.
    pub fn try_register(
        &self,
        ip: IpAddr,
        user_id: UserId,
        purpose: Purpose,
        device_ids: Vec<DeviceId>,
    ) -> Option<ConnectionId> {
        match self.ip_counts.entry(ip) {
            Entry::Occupied(mut count) => {
                if *count.get() >= self.ip_limit {
                    return None;
                }
                *count.get_mut() += 1;
            }
            Entry::Vacant(count) => {
                if self.ip_limit == 0 {
                    return None;
                }
                count.insert(1);
            }
        }

        let connection_id = ConnectionId::new();

        if purpose == Purpose::Data {
            for device_id in &device_ids {
                self.device_index
                    .entry(device_id.clone())
                    .or_default()
                    .insert(connection_id.clone());
            }
        }

        self.connections.insert(
            connection_id.clone(),
            StreamConnection {
                ip,
                user_id,
                purpose,
                device_ids,
                connected_at: Utc::now(),
            },
        );

        Some(connection_id)
    }

    /// Unregister a connection. Idempotent: unknown ids are a no-op.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        let Some((_, connection)) = self.connections.remove(connection_id) else {
            return;
        };

        // IP counter floors at zero; the key is dropped when it gets there.
        // Guards are released before removal to avoid re-entrant locking.
        let mut remove_ip = false;
        if let Some(mut count) = self.ip_counts.get_mut(&connection.ip) {
            *count = count.saturating_sub(1);
            remove_ip = *count == 0;
        }
        if remove_ip {
            self.ip_counts.remove(&connection.ip);
        }

        for device_id in &connection.device_ids {
            let mut prune = false;
            if let Some(mut subscribers) = self.device_index.get_mut(device_id) {
                subscribers.remove(connection_id);
                prune = subscribers.is_empty();
            }
            if prune {
                self.device_index.remove(device_id);
            }
        }

        debug!(
            "Unregistered stream connection {} for user {}",
            connection_id.as_str(),
            connection.user_id
        );
    }

    /// Per-user connection counts split by purpose.
    pub fn user_stats(&self, user_id: &str) -> UserConnectionStats {
        let mut stats = UserConnectionStats::default();
        for entry in self.connections.iter() {
            if entry.value().user_id == user_id {
                match entry.value().purpose {
                    Purpose::Alerts => stats.alerts += 1,
                    Purpose::Data => stats.data += 1,
                    Purpose::Any => {}
                }
                stats.total += 1;
            }
        }
        stats
    }

    /// A user's currently open connections.
    pub fn user_connections(&self, user_id: &str) -> Vec<ConnectionSummary> {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| ConnectionSummary {
                connection_id: entry.key().as_str().to_string(),
                purpose: entry.value().purpose,
                device_ids: entry.value().device_ids.clone(),
                connected_at: entry.value().connected_at,
            })
            .collect()
    }

    /// Total open connections across all users.
    pub fn total(&self) -> usize {
        self.connections.len()
    }

    /// Open data-connection counts per device, across all users.
    pub fn device_counts(&self) -> HashMap<DeviceId, usize> {
        self.device_index
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }

    /// Open data-connection counts per device, scoped to one user.
    pub fn user_device_counts(&self, user_id: &str) -> HashMap<DeviceId, usize> {
        let mut counts: HashMap<DeviceId, usize> = HashMap::new();
        for entry in self.connections.iter() {
            let connection = entry.value();
            if connection.user_id == user_id && connection.purpose == Purpose::Data {
                for device_id in &connection.device_ids {
                    *counts.entry(device_id.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    #[cfg(test)]
    fn ip_count(&self, ip: IpAddr) -> usize {
        self.ip_counts.get(&ip).map(|count| *count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    fn data_devices(ids: &[&str]) -> Vec<DeviceId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_register_then_unregister_restores_indices_exactly() {
        let registry = ConnectionRegistry::new(5);
        let connection_id = registry
            .try_register(
                ip(1),
                "user-1".to_string(),
                Purpose::Data,
                data_devices(&["C02", "C03"]),
            )
            .unwrap();

        assert_eq!(registry.ip_count(ip(1)), 1);
        assert_eq!(registry.device_counts().len(), 2);

        registry.unregister(&connection_id);

        assert_eq!(registry.total(), 0);
        assert_eq!(registry.ip_count(ip(1)), 0);
        assert!(registry.ip_counts.is_empty());
        assert!(registry.device_index.is_empty());
    }

    #[test]
    fn test_unregister_unknown_id_is_a_noop() {
        let registry = ConnectionRegistry::new(5);
        registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .unwrap();

        registry.unregister(&ConnectionId::new());
        assert_eq!(registry.total(), 1);
        assert_eq!(registry.ip_count(ip(1)), 1);
    }

    #[test]
    fn test_unregister_twice_does_not_underflow() {
        let registry = ConnectionRegistry::new(5);
        let connection_id = registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .unwrap();

        registry.unregister(&connection_id);
        registry.unregister(&connection_id);
        assert_eq!(registry.ip_count(ip(1)), 0);
        assert!(registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .is_some());
    }

    #[test]
    fn test_ip_quota_rejects_sixth_connection() {
        let registry = ConnectionRegistry::new(5);
        for _ in 0..5 {
            assert!(registry
                .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
                .is_some());
        }

        assert!(registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .is_none());
        assert_eq!(registry.user_stats("user-1").total, 5);

        // a different IP is unaffected
        assert!(registry
            .try_register(ip(2), "user-2".to_string(), Purpose::Alerts, vec![])
            .is_some());
    }

    #[test]
    fn test_quota_frees_up_after_disconnect() {
        let registry = ConnectionRegistry::new(1);
        let connection_id = registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .unwrap();
        assert!(registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .is_none());

        registry.unregister(&connection_id);
        assert!(registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .is_some());
    }

    #[test]
    fn test_simultaneous_registrations_cannot_exceed_ip_quota() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let registry = Arc::new(ConnectionRegistry::new(5));
        for _ in 0..4 {
            registry
                .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
                .unwrap();
        }

        // Two requests race for the last slot; exactly one may win.
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|result| matches!(result, Ok(Some(_))))
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(registry.ip_count(ip(1)), 5);
        assert_eq!(registry.total(), 5);
    }

    #[test]
    fn test_zero_limit_rejects_without_leaving_a_counter() {
        let registry = ConnectionRegistry::new(0);
        assert!(registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .is_none());
        assert!(registry.ip_counts.is_empty());
    }

    #[test]
    fn test_user_stats_split_by_purpose() {
        let registry = ConnectionRegistry::new(10);
        registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .unwrap();
        registry
            .try_register(
                ip(1),
                "user-1".to_string(),
                Purpose::Data,
                data_devices(&["C02"]),
            )
            .unwrap();
        registry
            .try_register(ip(2), "user-2".to_string(), Purpose::Alerts, vec![])
            .unwrap();

        let stats = registry.user_stats("user-1");
        assert_eq!(stats.alerts, 1);
        assert_eq!(stats.data, 1);
        assert_eq!(stats.total, 2);
        assert_eq!(registry.total(), 3);
    }

    #[test]
    fn test_device_index_tracks_only_data_connections() {
        let registry = ConnectionRegistry::new(10);
        registry
            .try_register(ip(1), "user-1".to_string(), Purpose::Alerts, vec![])
            .unwrap();
        registry
            .try_register(
                ip(1),
                "user-1".to_string(),
                Purpose::Data,
                data_devices(&["C02"]),
            )
            .unwrap();
        registry
            .try_register(
                ip(2),
                "user-2".to_string(),
                Purpose::Data,
                data_devices(&["C02", "C03"]),
            )
            .unwrap();

        let counts = registry.device_counts();
        assert_eq!(counts.get("C02"), Some(&2));
        assert_eq!(counts.get("C03"), Some(&1));

        let user_counts = registry.user_device_counts("user-2");
        assert_eq!(user_counts.get("C02"), Some(&1));
        assert_eq!(user_counts.get("C03"), Some(&1));
        assert!(registry.user_device_counts("user-1").get("C03").is_none());
    }

    #[test]
    fn test_disconnect_removes_devices_from_global_counts() {
        let registry = ConnectionRegistry::new(10);
        let connection_id = registry
            .try_register(
                ip(1),
                "user-1".to_string(),
                Purpose::Data,
                data_devices(&["C02", "C03"]),
            )
            .unwrap();
        registry
            .try_register(
                ip(2),
                "user-2".to_string(),
                Purpose::Data,
                data_devices(&["C02"]),
            )
            .unwrap();

        registry.unregister(&connection_id);

        let counts = registry.device_counts();
        assert_eq!(counts.get("C02"), Some(&1));
        assert!(counts.get("C03").is_none());
    }

    #[test]
    fn test_user_connections_lists_open_connections() {
        let registry = ConnectionRegistry::new(10);
        let connection_id = registry
            .try_register(
                ip(1),
                "user-1".to_string(),
                Purpose::Data,
                data_devices(&["C02"]),
            )
            .unwrap();

        let connections = registry.user_connections("user-1");
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].connection_id, connection_id.as_str());
        assert_eq!(connections[0].device_ids, vec!["C02".to_string()]);
        assert!(registry.user_connections("user-2").is_empty());
    }
}
