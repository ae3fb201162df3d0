use anyhow::Result;
use async_trait::async_trait;
use events::{EventHandler, StreamEvent, CONNECTION, HEARTBEAT};
use log::*;
use sse::{Client, EventSourceTransport, StreamOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Forwards every received event into a channel the scenarios read from.
struct Forward {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

#[async_trait]
impl EventHandler for Forward {
    async fn handle(&self, event: &StreamEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!("Probe receiver dropped");
        }
    }
}

/// A stream client subscribed to the events the scenarios look for.
pub struct Probe {
    client: Arc<Client>,
    event_rx: mpsc::UnboundedReceiver<StreamEvent>,
}

impl Probe {
    pub fn connect(url: &str, cookie: Option<&str>, options: StreamOptions) -> Self {
        let mut transport = EventSourceTransport::new();
        if let Some(cookie) = cookie {
            transport = transport.with_cookie(cookie);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let client = Client::new(Arc::new(transport));
        let forward: Arc<dyn EventHandler> = Arc::new(Forward { tx });
        for name in [
            CONNECTION,
            HEARTBEAT,
            events::STATS_UPDATE,
            events::ACTIVITY_UPDATE,
            events::REQUESTS_UPDATE,
            events::SUPPORT_UPDATE,
        ] {
            client.on(name, forward.clone());
        }
        client.connect(url, options);

        Self {
            client,
            event_rx: rx,
        }
    }

    /// Wait for the first event named `name` that satisfies `accept`.
    pub async fn wait_for<F>(&mut self, name: &str, timeout: Duration, accept: F) -> Result<StreamEvent>
    where
        F: Fn(&StreamEvent) -> bool,
    {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", name);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.name == name && accept(&event) => return Ok(event),
                Ok(Some(_)) => continue,
                Ok(None) => anyhow::bail!("Stream client dropped"),
                Err(_) => anyhow::bail!("Timeout waiting for event: {}", name),
            }
        }
    }

    pub async fn close(self) {
        self.client.close().await;
    }
}
