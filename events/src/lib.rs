//! Event plumbing shared by the stream client and the feature modules.
//!
//! # Architecture
//!
//! - **StreamEvent**: a named event with a parsed JSON payload, either pushed by
//!   the server or synthesized by the stream client (`connection`)
//! - **EventHandler**: trait implemented by anything that reacts to events
//! - **ListenerRegistry**: maps event names to ordered handler lists
//!
//! This crate has no dependencies on internal crates so both `sse` and `domain`
//! can build on it. Payloads are carried as `serde_json::Value`; consumers
//! decode them into their own typed shapes.

use async_trait::async_trait;
use dashmap::DashMap;
use log::*;
use serde_json::Value;
use std::sync::Arc;

/// Synthetic event emitted by the stream client on every connection transition.
pub const CONNECTION: &str = "connection";
/// Keep-alive event forwarded from the server.
pub const HEARTBEAT: &str = "heartbeat";
/// Dashboard statistics push.
pub const STATS_UPDATE: &str = "stats_update";
/// Recent activity feed push.
pub const ACTIVITY_UPDATE: &str = "activity_update";
/// Customer request list push.
pub const REQUESTS_UPDATE: &str = "requests_update";
/// Support conversation list push.
pub const SUPPORT_UPDATE: &str = "support_update";

/// Name used for frames that arrive without an explicit event name.
pub const DEFAULT_EVENT: &str = "message";

/// A single event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub name: String,
    pub payload: Value,
    /// Server-assigned id of the frame, if any. Synthetic events have none.
    pub id: Option<String>,
}

impl StreamEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            id: None,
        }
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }
}

/// Trait for handling stream events.
/// Implementations must not let failures escape: a background push should
/// never take down the task delivering it.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &StreamEvent);
}

/// Mapping from event name to the handlers registered for it.
/// Handlers for one name run sequentially in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: DashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
        }
    }

    /// Register a handler for `event_name`. The same handler may be registered
    /// more than once and will then run once per registration.
    pub fn on(&self, event_name: &str, handler: Arc<dyn EventHandler>) {
        self.listeners
            .entry(event_name.to_string())
            .or_default()
            .push(handler);
    }

    /// Remove every handler registered for `event_name`.
    pub fn off(&self, event_name: &str) {
        if self.listeners.remove(event_name).is_some() {
            debug!("Removed all listeners for {event_name}");
        }
    }

    /// Remove a single handler by reference equality. Returns whether anything
    /// was removed.
    pub fn remove(&self, event_name: &str, handler: &Arc<dyn EventHandler>) -> bool {
        let mut removed = false;
        if let Some(mut entry) = self.listeners.get_mut(event_name) {
            let before = entry.len();
            entry.retain(|registered| !Arc::ptr_eq(registered, handler));
            removed = entry.len() != before;

            if entry.is_empty() {
                drop(entry); // Release lock before removal
                self.listeners.remove(event_name);
            }
        }
        removed
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners
            .get(event_name)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Deliver an event to every handler registered under its name.
    pub async fn dispatch(&self, event: &StreamEvent) {
        // Clone the list so no map lock is held across an await point.
        let handlers = match self.listeners.get(&event.name) {
            Some(entry) => entry.clone(),
            None => {
                trace!("No listeners for {} event", event.name);
                return;
            }
        };

        for handler in handlers.iter() {
            handler.handle(event).await;
        }
    }
}
