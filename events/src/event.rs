use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kinds of events that can appear on a telemetry stream.
///
/// Wire names use the kebab-case form (`realtime-update`, `machine-alert`,
/// ...). `System` carries synthetic events such as heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    RealtimeUpdate,
    SpcUpdate,
    SpcSeriesUpdate,
    MachineAlert,
    AlarmUpdate,
    MachineStatus,
    System,
}

impl EventKind {
    /// The SSE `event:` field name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RealtimeUpdate => "realtime-update",
            EventKind::SpcUpdate => "spc-update",
            EventKind::SpcSeriesUpdate => "spc-series-update",
            EventKind::MachineAlert => "machine-alert",
            EventKind::AlarmUpdate => "alarm-update",
            EventKind::MachineStatus => "machine-status",
            EventKind::System => "system",
        }
    }
}

/// A single event as delivered to stream subscribers. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Optional SSE event id. Upstream translations set a fresh UUID so
    /// clients can detect gaps; synthetic events usually carry none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The originating device, when the event is device-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub data: Value,
}

impl StreamEvent {
    /// An event tied to a specific device, with a fresh id.
    pub fn for_device(kind: EventKind, device_id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            kind,
            device_id: Some(device_id.into()),
            data,
        }
    }

    /// A synthetic `system` event. Carries no device and no id.
    pub fn system(data: Value) -> Self {
        Self {
            id: None,
            kind: EventKind::System,
            device_id: None,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(EventKind::RealtimeUpdate.as_str(), "realtime-update");
        assert_eq!(EventKind::SpcSeriesUpdate.as_str(), "spc-series-update");
        assert_eq!(EventKind::System.as_str(), "system");

        // serde rename must agree with as_str for every kind
        for kind in [
            EventKind::RealtimeUpdate,
            EventKind::SpcUpdate,
            EventKind::SpcSeriesUpdate,
            EventKind::MachineAlert,
            EventKind::AlarmUpdate,
            EventKind::MachineStatus,
            EventKind::System,
        ] {
            let serialized = serde_json::to_value(kind).unwrap();
            assert_eq!(serialized, json!(kind.as_str()));
        }
    }

    #[test]
    fn test_system_event_has_no_device_or_id() {
        let event = StreamEvent::system(json!({"kind": "heartbeat"}));
        assert_eq!(event.kind, EventKind::System);
        assert!(event.id.is_none());
        assert!(event.device_id.is_none());
    }

    #[test]
    fn test_for_device_sets_id_and_device() {
        let event = StreamEvent::for_device(EventKind::RealtimeUpdate, "C02", json!({"v": 1}));
        assert!(event.id.is_some());
        assert_eq!(event.device_id.as_deref(), Some("C02"));
    }
}
