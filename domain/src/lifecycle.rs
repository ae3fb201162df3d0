use events::EventHandler;
use log::*;
use sse::Client;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Everything a feature module started and must stop again: stream
/// subscriptions and background tasks (poll timers and the like).
pub struct Lifecycle {
    stream: Arc<Client>,
    subscriptions: Mutex<Vec<(String, Arc<dyn EventHandler>)>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Lifecycle {
    pub fn new(stream: Arc<Client>) -> Self {
        Self {
            stream,
            subscriptions: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Register `handler` on the stream until this lifecycle is destroyed.
    pub fn subscribe(&self, event_name: &str, handler: Arc<dyn EventHandler>) {
        if self.is_destroyed() {
            warn!("Ignoring {event_name} subscription on a destroyed lifecycle");
            return;
        }
        self.stream.on(event_name, handler.clone());
        lock(&self.subscriptions).push((event_name.to_string(), handler));
    }

    /// Spawn a task that is aborted when this lifecycle is destroyed.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_destroyed() {
            warn!("Ignoring task spawn on a destroyed lifecycle");
            return;
        }
        let mut tasks = lock(&self.tasks);
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(tokio::spawn(task));
    }

    pub fn subscription_count(&self) -> usize {
        lock(&self.subscriptions).len()
    }

    pub fn running_tasks(&self) -> usize {
        lock(&self.tasks)
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Remove every subscription and abort every task. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.teardown();
    }

    fn teardown(&self) {
        let subscriptions = std::mem::take(&mut *lock(&self.subscriptions));
        for (event_name, handler) in subscriptions {
            self.stream.remove(&event_name, &handler);
        }
        let tasks = std::mem::take(&mut *lock(&self.tasks));
        for handle in tasks {
            handle.abort();
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        if !self.destroyed.swap(true, Ordering::SeqCst) {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use events::StreamEvent;
    use futures_util::stream::{self, StreamExt};
    use sse::{Frame, FrameStream, Transport};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Idle;

    #[async_trait]
    impl Transport for Idle {
        async fn open(&self, _url: &str, _last: Option<&str>) -> Result<FrameStream, sse::Error> {
            Ok(stream::pending::<Result<Frame, sse::Error>>().boxed())
        }
    }

    struct Noop;

    #[async_trait]
    impl EventHandler for Noop {
        async fn handle(&self, _event: &StreamEvent) {}
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_removes_subscriptions_and_aborts_tasks() {
        let stream = Client::new(Arc::new(Idle));
        let lifecycle = Lifecycle::new(stream.clone());
        stream.on("stats_update", Arc::new(Noop));

        lifecycle.subscribe("stats_update", Arc::new(Noop));
        lifecycle.subscribe("connection", Arc::new(Noop));
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        lifecycle.spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(stream.listener_count("stats_update"), 2);
        assert_eq!(lifecycle.running_tasks(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        lifecycle.destroy();
        lifecycle.destroy();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(lifecycle.subscription_count(), 0);
        // Another owner's handler on the same event survives.
        assert_eq!(stream.listener_count("stats_update"), 1);
        assert_eq!(stream.listener_count("connection"), 0);
    }

    #[tokio::test]
    async fn dropping_a_lifecycle_tears_it_down() {
        let stream = Client::new(Arc::new(Idle));
        {
            let lifecycle = Lifecycle::new(stream.clone());
            lifecycle.subscribe("activity_update", Arc::new(Noop));
            assert_eq!(stream.listener_count("activity_update"), 1);
        }
        assert_eq!(stream.listener_count("activity_update"), 0);
    }

    #[tokio::test]
    async fn destroyed_lifecycle_refuses_new_work() {
        let stream = Client::new(Arc::new(Idle));
        let lifecycle = Lifecycle::new(stream.clone());
        lifecycle.destroy();

        lifecycle.subscribe("stats_update", Arc::new(Noop));
        lifecycle.spawn(async {});
        assert_eq!(lifecycle.subscription_count(), 0);
        assert_eq!(lifecycle.running_tasks(), 0);
        assert_eq!(stream.listener_count("stats_update"), 0);
    }
}
