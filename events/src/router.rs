use crate::event::{EventKind, StreamEvent};
use log::*;
use std::collections::HashSet;
use tokio::sync::broadcast;

/// Default broadcast buffer size per subscriber. A subscriber that falls
/// further behind than this loses the overwritten events (at-most-once).
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Purpose-level event filter applied by every subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Alert-purpose streams: machine alerts, alarm updates and system events.
    Alerts,
    /// Data-purpose streams: telemetry, SPC, status and system events.
    Data,
}

impl Projection {
    pub fn accepts(&self, kind: EventKind) -> bool {
        match self {
            Projection::Alerts => matches!(
                kind,
                EventKind::MachineAlert | EventKind::AlarmUpdate | EventKind::System
            ),
            Projection::Data => matches!(
                kind,
                EventKind::RealtimeUpdate
                    | EventKind::SpcUpdate
                    | EventKind::SpcSeriesUpdate
                    | EventKind::MachineStatus
                    | EventKind::System
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct EventFilter {
    projection: Projection,
    /// When present, only events carrying a `device_id` contained in this
    /// set pass. An event without a `device_id` never matches, and an empty
    /// set matches nothing.
    device_ids: Option<HashSet<String>>,
}

impl EventFilter {
    fn matches(&self, event: &StreamEvent) -> bool {
        if !self.projection.accepts(event.kind) {
            return false;
        }
        match &self.device_ids {
            None => true,
            Some(device_ids) => match &event.device_id {
                Some(id) => device_ids.contains(id),
                None => false,
            },
        }
    }
}

/// Single-publisher, N-subscriber event fan-out with no replay buffer.
///
/// Built on `tokio::sync::broadcast`: a subscriber only observes events
/// published strictly after it subscribed, and per-subscriber delivery
/// preserves publish order.
#[derive(Clone)]
pub struct EventRouter {
    tx: broadcast::Sender<StreamEvent>,
}

impl EventRouter {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self { tx }
    }

    /// Publish an event to every current subscriber. Returns the number of
    /// subscribers the event was delivered to; zero subscribers is not an
    /// error, the event is simply dropped.
    pub fn publish(&self, event: StreamEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => 0,
        }
    }

    /// Subscribe to alert-purpose events (machine-alert, alarm-update, system).
    pub fn alert_projection(&self) -> Subscription {
        self.subscribe(Projection::Alerts)
    }

    /// Subscribe to data-purpose events (realtime, SPC, status, system).
    pub fn data_projection(&self) -> Subscription {
        self.subscribe(Projection::Data)
    }

    fn subscribe(&self, projection: Projection) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter: EventFilter {
                projection,
                device_ids: None,
            },
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

/// One subscriber's filtered view of the router.
///
/// Dropping the subscription detaches it from the router; events dispatched
/// after the drop are never observed.
pub struct Subscription {
    rx: broadcast::Receiver<StreamEvent>,
    filter: EventFilter,
}

impl Subscription {
    /// Restrict this subscription to events from the given devices.
    /// Events without a `device_id` (including system events) stop matching.
    pub fn scoped_to_devices(mut self, device_ids: HashSet<String>) -> Self {
        self.filter.device_ids = Some(device_ids);
        self
    }

    /// Wait for the next event passing this subscription's filter.
    /// Returns `None` once the router is gone. A subscriber that lagged
    /// behind the broadcast buffer loses the overwritten events and keeps
    /// going.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("stream subscriber lagged; {skipped} events skipped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
