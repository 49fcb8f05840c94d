//! Upstream channel ingestion.
//!
//! The protocol gateways (OPC-UA/MQTT, out of scope here) hand processed
//! messages over three fixed channels: processed realtime telemetry,
//! processed SPC results, and machine alerts. A single ingest task owns the
//! receiving ends, translates each message into a [`StreamEvent`] and
//! publishes it on the router. Messages without a `deviceId` are dropped.

use crate::event::{EventKind, StreamEvent};
use crate::router::EventRouter;
use log::*;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Producer handles given to the protocol gateways.
#[derive(Clone)]
pub struct UpstreamSenders {
    pub realtime: UnboundedSender<Value>,
    pub spc: UnboundedSender<Value>,
    pub alerts: UnboundedSender<Value>,
}

/// Consumer handles owned by the ingest task.
pub struct UpstreamReceivers {
    pub realtime: UnboundedReceiver<Value>,
    pub spc: UnboundedReceiver<Value>,
    pub alerts: UnboundedReceiver<Value>,
}

/// Create the three fixed upstream channels.
pub fn channels() -> (UpstreamSenders, UpstreamReceivers) {
    let (realtime_tx, realtime_rx) = mpsc::unbounded_channel();
    let (spc_tx, spc_rx) = mpsc::unbounded_channel();
    let (alerts_tx, alerts_rx) = mpsc::unbounded_channel();
    (
        UpstreamSenders {
            realtime: realtime_tx,
            spc: spc_tx,
            alerts: alerts_tx,
        },
        UpstreamReceivers {
            realtime: realtime_rx,
            spc: spc_rx,
            alerts: alerts_rx,
        },
    )
}

/// Spawn the ingest task. Subscribes exactly once to the three upstream
/// channels and runs until all senders are dropped.
pub fn spawn(router: EventRouter, receivers: UpstreamReceivers) -> JoinHandle<()> {
    tokio::spawn(async move {
        let UpstreamReceivers {
            mut realtime,
            mut spc,
            mut alerts,
        } = receivers;
        let (mut realtime_open, mut spc_open, mut alerts_open) = (true, true, true);

        while realtime_open || spc_open || alerts_open {
            tokio::select! {
                message = realtime.recv(), if realtime_open => match message {
                    Some(message) => translate(&router, EventKind::RealtimeUpdate, "data", message),
                    None => realtime_open = false,
                },
                message = spc.recv(), if spc_open => match message {
                    Some(message) => translate(&router, EventKind::SpcUpdate, "data", message),
                    None => spc_open = false,
                },
                message = alerts.recv(), if alerts_open => match message {
                    Some(message) => translate(&router, EventKind::MachineAlert, "alert", message),
                    None => alerts_open = false,
                },
            }
        }

        debug!("all upstream channels closed, ingest task exiting");
    })
}

fn translate(router: &EventRouter, kind: EventKind, payload_key: &str, message: Value) {
    let Some(device_id) = message.get("deviceId").and_then(Value::as_str) else {
        trace!("dropping upstream {} message without deviceId", kind.as_str());
        return;
    };
    let device_id = device_id.to_string();
    let payload = message.get(payload_key).cloned().unwrap_or(message);
    router.publish(StreamEvent::for_device(kind, device_id, payload));
}
