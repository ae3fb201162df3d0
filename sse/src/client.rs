use crate::connection::{ConnectionId, ConnectionState, ConnectionStatus};
use crate::reconnect::{Backoff, StreamOptions};
use crate::transport::{Frame, Transport};
use events::{EventHandler, ListenerRegistry, StreamEvent, DEFAULT_EVENT};
use futures_util::stream::StreamExt;
use log::*;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// Event stream client: one persistent connection, listener dispatch and the
/// reconnect loop.
pub struct Client {
    id: ConnectionId,
    registry: ListenerRegistry,
    transport: Arc<dyn Transport>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    closed: AtomicBool,
    /// Held while a status change is published and its event dispatched.
    transitions: AsyncMutex<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        let (state_tx, _) = watch::channel(ConnectionState::new());
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            id: ConnectionId::new(),
            registry: ListenerRegistry::new(),
            transport,
            state_tx,
            shutdown_tx,
            closed: AtomicBool::new(false),
            transitions: AsyncMutex::new(()),
            task: Mutex::new(None),
        })
    }

    /// Register a handler for a named event. Handlers for the same name run in
    /// registration order.
    pub fn on(&self, event_name: &str, handler: Arc<dyn EventHandler>) {
        self.registry.on(event_name, handler);
    }

    /// Remove every handler for a named event.
    pub fn off(&self, event_name: &str) {
        self.registry.off(event_name);
    }

    /// Remove one handler, matched by reference.
    pub fn remove(&self, event_name: &str, handler: &Arc<dyn EventHandler>) -> bool {
        self.registry.remove(event_name, handler)
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.registry.listener_count(event_name)
    }

    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Start the connection task. Never fails: connection problems go through
    /// the reconnect path and surface as `connection` events.
    pub fn connect(self: &Arc<Self>, endpoint_url: impl Into<String>, options: StreamOptions) {
        if self.is_closed() {
            warn!("SSE client {} is closed; ignoring connect", self.id);
            return;
        }

        let mut task = match self.task.lock() {
            Ok(task) => task,
            Err(poisoned) => poisoned.into_inner(),
        };
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("SSE client {} is already connected; ignoring connect", self.id);
            return;
        }

        let url = endpoint_url.into();
        info!(
            "SSE client {} connecting to {url} (max attempts {}, delay {:?}..{:?})",
            self.id,
            options.max_reconnect_attempts,
            options.reconnect_delay,
            options.max_reconnect_delay
        );
        *task = Some(tokio::spawn(Arc::clone(self).run(url, options)));
    }

    /// Tear down the connection and stop reconnecting. Idempotent.
    ///
    /// Waits for an in-flight `connection` dispatch to finish, so `closed` is
    /// always the last `connection` event. A `connection` handler must not
    /// await `close` itself.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shutdown_tx.send_replace(true);
        let _transition = self.transitions.lock().await;
        self.state_tx
            .send_modify(|state| state.status = ConnectionStatus::Closed);
        info!("SSE client {} closed", self.id);

        let event = self.state().to_event();
        self.registry.dispatch(&event).await;
    }

    async fn run(self: Arc<Self>, url: String, options: StreamOptions) {
        let backoff = Backoff::new(&options);
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.transition(ConnectionStatus::Connecting, failures).await;

            let last_event_id = self.state_tx.borrow().last_event_id.clone();
            let opened = tokio::select! {
                opened = self.transport.open(&url, last_event_id.as_deref()) => opened,
                _ = shutdown.changed() => break,
            };

            match opened {
                Ok(mut frames) => {
                    failures = 0;
                    self.transition(ConnectionStatus::Connected, 0).await;

                    loop {
                        tokio::select! {
                            frame = frames.next() => match frame {
                                Some(Ok(frame)) => self.deliver(frame).await,
                                Some(Err(e)) => {
                                    warn!("SSE client {} lost its connection: {e}", self.id);
                                    break;
                                }
                                None => {
                                    warn!("SSE stream for client {} ended", self.id);
                                    break;
                                }
                            },
                            _ = shutdown.changed() => return,
                        }
                    }
                }
                Err(e) => {
                    warn!("SSE client {} failed to connect to {url}: {e}", self.id);
                }
            }

            failures += 1;
            if failures > options.max_reconnect_attempts {
                error!(
                    "SSE client {} giving up after {} consecutive failures",
                    self.id, failures
                );
                self.transition(ConnectionStatus::Error, failures).await;
                break;
            }

            let delay = backoff.delay_for(failures);
            info!(
                "SSE client {} reconnecting in {delay:?} (attempt {failures} of {})",
                self.id, options.max_reconnect_attempts
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }
    }

    /// Publish a status change, unless the client was closed in the meantime.
    async fn transition(&self, status: ConnectionStatus, retry_count: u32) {
        let _transition = self.transitions.lock().await;
        if self.is_closed() {
            return;
        }

        self.state_tx.send_modify(|state| {
            state.status = status;
            state.retry_count = retry_count;
        });
        debug!("SSE client {} is {status}", self.id);

        let event = self.state().to_event();
        self.registry.dispatch(&event).await;
    }

    async fn deliver(&self, frame: Frame) {
        if let Some(id) = frame.id.as_ref().filter(|id| !id.is_empty()) {
            self.state_tx
                .send_modify(|state| state.last_event_id = Some(id.clone()));
        }

        let name = if frame.event.is_empty() {
            DEFAULT_EVENT.to_string()
        } else {
            frame.event
        };

        let payload = match parse_payload(&frame.data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping malformed {name} event: {e}");
                return;
            }
        };

        let event = StreamEvent::new(name, payload).with_id(frame.id);
        self.registry.dispatch(&event).await;
    }
}

/// Frames without data (bare keep-alives) carry a null payload.
fn parse_payload(data: &str) -> Result<Value, serde_json::Error> {
    if data.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(data)
}
