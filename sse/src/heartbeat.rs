//! Periodic keepalive for open stream connections.
//!
//! Every open connection merges these ticks into its delivered sequence so
//! clients can detect a dead transport without waiting for telemetry. The
//! ticks carry no registry side effects, and a missed tick simply delays to
//! the next one rather than bursting.

use domain::timestamp;
use events::StreamEvent;
use serde_json::json;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 25;

#[derive(Debug, Clone, Copy)]
pub struct HeartbeatEmitter {
    period: Duration,
}

impl HeartbeatEmitter {
    pub fn new(period_secs: u64) -> Self {
        Self {
            period: Duration::from_secs(period_secs),
        }
    }

    /// A fresh per-connection tick source. The first tick fires one full
    /// period after the connection opens, not immediately.
    pub fn ticks(&self) -> Interval {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// The heartbeat frame: a system event with the current timestamp.
    pub fn event() -> StreamEvent {
        StreamEvent::system(json!({
            "kind": "heartbeat",
            "timestamp": timestamp::iso8601_now(),
        }))
    }
}

impl Default for HeartbeatEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_INTERVAL_SECS)
    }
}
