use async_trait::async_trait;
use events::{EventHandler, StreamEvent};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Records when the server last sent a heartbeat.
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    last_seen: Mutex<Option<Instant>>,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<Instant> {
        match self.last_seen.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// True when no heartbeat arrived within `max_age`, or none ever did.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.last_seen()
            .map_or(true, |seen| seen.elapsed() > max_age)
    }
}

#[async_trait]
impl EventHandler for HeartbeatMonitor {
    async fn handle(&self, _event: &StreamEvent) {
        let now = Instant::now();
        match self.last_seen.lock() {
            Ok(mut guard) => *guard = Some(now),
            Err(poisoned) => *poisoned.into_inner() = Some(now),
        }
    }
}
