use crate::context::AppContext;
use crate::error::Error;
use crate::lifecycle::Lifecycle;
use crate::notifier::{Notice, Notifier};
use crate::render::Renderer;
use crate::sequencer::RequestSequencer;
use crate::snapshot::Snapshot;
use crate::source::{ApiSource, SnapshotSource};
use crate::state_holder::{PushOutcome, StateHolder};
use async_trait::async_trait;
use events::{EventHandler, StreamEvent, CONNECTION};
use log::*;
use sse::{Client, ConnectionState, ConnectionStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Shortest period the polling fallback will refresh at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One feature panel: its state holder, stream subscription and polling
/// fallback, all torn down together by [`FeatureModule::destroy`].
pub struct FeatureModule<S: Snapshot> {
    holder: Arc<StateHolder<S>>,
    source: Arc<dyn SnapshotSource<S>>,
    sequencer: Arc<RequestSequencer>,
    notifier: Arc<dyn Notifier>,
    lifecycle: Lifecycle,
    poll_interval: Duration,
    polling: AtomicBool,
}

impl<S: Snapshot> FeatureModule<S> {
    pub fn new(
        stream: Arc<Client>,
        holder: Arc<StateHolder<S>>,
        source: Arc<dyn SnapshotSource<S>>,
        sequencer: Arc<RequestSequencer>,
        notifier: Arc<dyn Notifier>,
        poll_interval: Duration,
    ) -> Arc<Self> {
        let module = Arc::new(Self {
            holder,
            source,
            sequencer,
            notifier,
            lifecycle: Lifecycle::new(stream),
            poll_interval,
            polling: AtomicBool::new(false),
        });

        module.lifecycle.subscribe(S::EVENT, module.holder.clone());
        module.lifecycle.subscribe(
            CONNECTION,
            Arc::new(PollingFallback {
                module: Arc::downgrade(&module),
            }),
        );
        info!("Mounted {} module", module.name());
        module
    }

    /// Build a module from the application context, fetching over REST when
    /// polling.
    pub fn mount(ctx: &AppContext, renderer: Arc<dyn Renderer<S>>) -> Arc<Self> {
        let holder = Arc::new(StateHolder::new(
            renderer,
            ctx.surface.clone(),
            ctx.notifier.clone(),
        ));
        Self::new(
            ctx.stream.clone(),
            holder,
            Arc::new(ApiSource::<S>::new(ctx.api.clone())),
            ctx.sequencer.clone(),
            ctx.notifier.clone(),
            ctx.config.poll_interval(),
        )
    }

    pub fn name(&self) -> &str {
        self.holder.anchor()
    }

    pub fn holder(&self) -> &Arc<StateHolder<S>> {
        &self.holder
    }

    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    /// Fetch the snapshot and push it through the state holder. Returns
    /// `Ok(None)` when a newer refresh of this module superseded this one.
    pub async fn refresh(&self) -> Result<Option<PushOutcome>, Error> {
        match self
            .sequencer
            .run(self.name(), self.source.fetch())
            .await
        {
            Some(Ok(snapshot)) => Ok(Some(self.holder.handle_push(snapshot))),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Initial load; failures are reported to the user rather than returned.
    pub async fn load(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Initial load of {} failed: {e}", self.name());
            self.notifier.notify(Notice::error(e.user_message()));
        }
    }

    /// Refresh every `poll_interval` (at least [`MIN_POLL_INTERVAL`]) until
    /// destroyed. Starting twice is a no-op.
    pub fn start_polling(self: &Arc<Self>) {
        if self.lifecycle.is_destroyed() || self.polling.swap(true, Ordering::SeqCst) {
            return;
        }
        let period = self.poll_interval.max(MIN_POLL_INTERVAL);
        info!("{} falling back to polling every {period:?}", self.name());

        let module = Arc::downgrade(self);
        self.lifecycle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(module) = module.upgrade() else {
                    break;
                };
                if let Err(e) = module.refresh().await {
                    warn!("Polling {} failed: {e}", module.name());
                }
            }
        });
    }

    pub fn destroy(&self) {
        self.lifecycle.destroy();
        self.polling.store(false, Ordering::SeqCst);
        info!("Destroyed {} module", self.name());
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.is_destroyed()
    }
}

/// Starts polling once the stream client gives up.
struct PollingFallback<S: Snapshot> {
    module: Weak<FeatureModule<S>>,
}

#[async_trait]
impl<S: Snapshot> EventHandler for PollingFallback<S> {
    async fn handle(&self, event: &StreamEvent) {
        let Some(state) = ConnectionState::from_event(event) else {
            return;
        };
        if state.status == ConnectionStatus::Error {
            if let Some(module) = self.module.upgrade() {
                module.start_polling();
            }
        }
    }
}
