use crate::notifier::Notifier;
use crate::render::{Renderer, Surface};
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use events::{EventHandler, StreamEvent};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Accepted and mounted.
    Rendered,
    /// Salient key equal to the last accepted snapshot; discarded.
    Unchanged,
    /// Accepted, but mounting failed. The failure was logged.
    RenderFailed,
}

/// Holds the last accepted snapshot for one feature module and re-renders
/// only when a push changes its salient key.
pub struct StateHolder<S: Snapshot> {
    current: Mutex<Option<S>>,
    renderer: Arc<dyn Renderer<S>>,
    surface: Arc<dyn Surface>,
    notifier: Arc<dyn Notifier>,
}

impl<S: Snapshot> StateHolder<S> {
    pub fn new(
        renderer: Arc<dyn Renderer<S>>,
        surface: Arc<dyn Surface>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            current: Mutex::new(None),
            renderer,
            surface,
            notifier,
        }
    }

    pub fn anchor(&self) -> &str {
        self.renderer.anchor()
    }

    pub fn current(&self) -> Option<S> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<S>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Accept `snapshot` if its salient key differs from the current one,
    /// then render and mount it. Never fails.
    pub fn handle_push(&self, snapshot: S) -> PushOutcome {
        // Held through the mount: racing pushes (stream and poll) mount in
        // acceptance order.
        let mut current = self.lock();
        if let Some(previous) = current.as_ref() {
            if previous.salient() == snapshot.salient() {
                trace!("{} push unchanged ({:?})", S::EVENT, snapshot.salient());
                return PushOutcome::Unchanged;
            }
        }

        let notices = current
            .as_ref()
            .map(|previous| S::notices(previous, &snapshot))
            .unwrap_or_default();
        debug!("{} accepted {:?}", S::EVENT, snapshot.salient());

        let rendered = self.renderer.render(&snapshot);
        *current = Some(snapshot);
        let outcome = match self.surface.mount(self.renderer.anchor(), &rendered) {
            Ok(()) => PushOutcome::Rendered,
            Err(e) => {
                warn!("Failed to mount {}: {e}", self.renderer.anchor());
                PushOutcome::RenderFailed
            }
        };
        drop(current);

        for notice in notices {
            self.notifier.notify(notice);
        }
        outcome
    }
}

#[async_trait]
impl<S: Snapshot> EventHandler for StateHolder<S> {
    async fn handle(&self, event: &StreamEvent) {
        match serde_json::from_value::<S>(event.payload.clone()) {
            Ok(snapshot) => {
                self.handle_push(snapshot);
            }
            Err(e) => warn!("Dropping {} event with unexpected shape: {e}", event.name),
        }
    }
}
