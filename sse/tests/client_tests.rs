use async_trait::async_trait;
use events::{EventHandler, StreamEvent, CONNECTION, STATS_UPDATE};
use futures_util::stream::{self, StreamExt};
use serde_json::json;
use sse::error::{stream_error, ErrorKind};
use sse::{Client, ConnectionState, ConnectionStatus, Error, Frame, FrameStream, StreamOptions, Transport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

/// What the scripted transport does on one `open` call.
enum Attempt {
    Fail,
    /// Connect, emit the frames, then drop the connection.
    Drop(Vec<Frame>),
    /// Connect, emit the frames, then stay open forever.
    Hold(Vec<Frame>),
}

#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Attempt>>,
    opens: Mutex<Vec<(Instant, Option<String>)>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Attempt>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            opens: Mutex::new(Vec::new()),
        })
    }

    fn open_times(&self) -> Vec<Instant> {
        self.opens.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    fn last_event_ids(&self) -> Vec<Option<String>> {
        self.opens.lock().unwrap().iter().map(|(_, id)| id.clone()).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, _url: &str, last_event_id: Option<&str>) -> Result<FrameStream, Error> {
        self.opens
            .lock()
            .unwrap()
            .push((Instant::now(), last_event_id.map(str::to_string)));

        // Once the script runs out every attempt fails.
        let attempt = self.script.lock().unwrap().pop_front().unwrap_or(Attempt::Fail);
        match attempt {
            Attempt::Fail => Err(stream_error(ErrorKind::Transport, "connection refused")),
            Attempt::Drop(frames) => Ok(stream::iter(frames.into_iter().map(Ok)).boxed()),
            Attempt::Hold(frames) => Ok(stream::iter(frames.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}

struct Forward(mpsc::UnboundedSender<StreamEvent>);

#[async_trait]
impl EventHandler for Forward {
    async fn handle(&self, event: &StreamEvent) {
        let _ = self.0.send(event.clone());
    }
}

/// Blocks the first `connecting` dispatch until released.
struct HoldFirstConnecting {
    held: AtomicBool,
    release: Arc<Notify>,
}

#[async_trait]
impl EventHandler for HoldFirstConnecting {
    async fn handle(&self, event: &StreamEvent) {
        let connecting = ConnectionState::from_event(event)
            .is_some_and(|state| state.status == ConnectionStatus::Connecting);
        if connecting && !self.held.swap(true, Ordering::SeqCst) {
            self.release.notified().await;
        }
    }
}

fn options(max_attempts: u32, delay_ms: u64, max_delay_ms: u64) -> StreamOptions {
    StreamOptions {
        max_reconnect_attempts: max_attempts,
        reconnect_delay: Duration::from_millis(delay_ms),
        max_reconnect_delay: Duration::from_millis(max_delay_ms),
    }
}

fn listen(client: &Client, event_name: &str) -> mpsc::UnboundedReceiver<StreamEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on(event_name, Arc::new(Forward(tx)));
    rx
}

async fn wait_for_status(
    rx: &mut mpsc::UnboundedReceiver<StreamEvent>,
    status: ConnectionStatus,
) -> ConnectionState {
    loop {
        let event = rx.recv().await.expect("connection events ended");
        let state = ConnectionState::from_event(&event).expect("connection payload");
        if state.status == status {
            return state;
        }
    }
}

fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

fn assert_gap(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn three_failures_back_off_then_fourth_is_terminal() {
    let transport = ScriptedTransport::new(vec![]);
    let client = Client::new(transport.clone());
    let mut connection = listen(&client, CONNECTION);

    client.connect("http://backend/realtime", options(3, 1000, 8000));

    let terminal = wait_for_status(&mut connection, ConnectionStatus::Error).await;
    assert_eq!(terminal.retry_count, 4);
    assert_eq!(client.state().status, ConnectionStatus::Error);

    let opens = transport.open_times();
    assert_eq!(opens.len(), 4, "initial attempt plus three reconnects");
    let waits = gaps(&opens);
    assert_gap(waits[0], 1000);
    assert_gap(waits[1], 2000);
    assert_gap(waits[2], 4000);

    // Nothing else is ever scheduled.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.open_times().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn backoff_is_capped_at_max_delay() {
    let transport = ScriptedTransport::new(vec![]);
    let client = Client::new(transport.clone());
    let mut connection = listen(&client, CONNECTION);

    client.connect("http://backend/realtime", options(6, 1000, 5000));
    wait_for_status(&mut connection, ConnectionStatus::Error).await;

    let waits = gaps(&transport.open_times());
    let expected = [1000, 2000, 4000, 5000, 5000, 5000];
    assert_eq!(waits.len(), expected.len());
    for (actual, expected_ms) in waits.into_iter().zip(expected) {
        assert_gap(actual, expected_ms);
    }
}

#[tokio::test(start_paused = true)]
async fn zero_attempts_makes_the_first_failure_terminal() {
    let transport = ScriptedTransport::new(vec![]);
    let client = Client::new(transport.clone());
    let mut connection = listen(&client, CONNECTION);

    client.connect("http://backend/realtime", options(0, 1000, 8000));
    wait_for_status(&mut connection, ConnectionStatus::Error).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.open_times().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn successful_connection_resets_the_backoff() {
    let transport = ScriptedTransport::new(vec![
        Attempt::Fail,
        Attempt::Fail,
        Attempt::Drop(vec![Frame::new(STATS_UPDATE, r#"{"order_count":1}"#)]),
        Attempt::Fail,
        Attempt::Hold(vec![]),
    ]);
    let client = Client::new(transport.clone());
    let mut connection = listen(&client, CONNECTION);

    client.connect("http://backend/realtime", options(5, 1000, 8000));

    wait_for_status(&mut connection, ConnectionStatus::Connected).await;
    wait_for_status(&mut connection, ConnectionStatus::Connected).await;

    let waits = gaps(&transport.open_times());
    assert_eq!(waits.len(), 4);
    assert_gap(waits[0], 1000);
    assert_gap(waits[1], 2000);
    // The drop after a good connection starts over at the initial delay.
    assert_gap(waits[2], 1000);
    assert_gap(waits[3], 2000);

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_dropped_without_stopping_delivery() {
    let transport = ScriptedTransport::new(vec![Attempt::Hold(vec![
        Frame::new(STATS_UPDATE, "<b>Warning</b>: Undefined index"),
        Frame::new(STATS_UPDATE, r#"{"order_count":7}"#),
    ])]);
    let client = Client::new(transport.clone());
    let mut stats = listen(&client, STATS_UPDATE);

    client.connect("http://backend/realtime", StreamOptions::default());

    let event = stats.recv().await.unwrap();
    assert_eq!(event.payload, json!({"order_count": 7}));
    assert_eq!(client.state().status, ConnectionStatus::Connected);
    assert!(stats.try_recv().is_err());

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn events_are_routed_by_name_and_last_event_id_is_resent() {
    let transport = ScriptedTransport::new(vec![
        Attempt::Drop(vec![
            Frame::new(events::HEARTBEAT, r#"{"time":1}"#).with_id("10"),
            Frame::new(STATS_UPDATE, r#"{"order_count":2}"#).with_id("11"),
        ]),
        Attempt::Hold(vec![]),
    ]);
    let client = Client::new(transport.clone());
    let mut stats = listen(&client, STATS_UPDATE);
    let mut heartbeats = listen(&client, events::HEARTBEAT);
    let mut connection = listen(&client, CONNECTION);

    client.connect("http://backend/realtime", options(3, 500, 8000));

    assert_eq!(heartbeats.recv().await.unwrap().id.as_deref(), Some("10"));
    assert_eq!(stats.recv().await.unwrap().payload, json!({"order_count": 2}));

    wait_for_status(&mut connection, ConnectionStatus::Connected).await;
    wait_for_status(&mut connection, ConnectionStatus::Connected).await;

    assert_eq!(
        transport.last_event_ids(),
        vec![None, Some("11".to_string())]
    );
    assert_eq!(client.state().last_event_id.as_deref(), Some("11"));

    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn close_is_idempotent_and_stops_reconnecting() {
    let transport = ScriptedTransport::new(vec![]);
    let client = Client::new(transport.clone());
    let mut connection = listen(&client, CONNECTION);

    client.connect("http://backend/realtime", options(10, 1000, 8000));
    wait_for_status(&mut connection, ConnectionStatus::Connecting).await;

    client.close().await;
    client.close().await;

    let closed = wait_for_status(&mut connection, ConnectionStatus::Closed).await;
    assert_eq!(closed.status, ConnectionStatus::Closed);

    let attempts = transport.open_times().len();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.open_times().len(), attempts);
    assert_eq!(client.state().status, ConnectionStatus::Closed);

    // Exactly one closed event, nothing after it.
    while let Ok(event) = connection.try_recv() {
        let state = ConnectionState::from_event(&event).unwrap();
        assert_ne!(state.status, ConnectionStatus::Closed);
    }

    // A closed client never reconnects.
    client.connect("http://backend/realtime", StreamOptions::default());
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.open_times().len(), attempts);
}

#[tokio::test(start_paused = true)]
async fn close_during_a_connecting_dispatch_publishes_closed_last() {
    let transport = ScriptedTransport::new(vec![Attempt::Hold(vec![])]);
    let client = Client::new(transport.clone());
    let mut connection = listen(&client, CONNECTION);
    let release = Arc::new(Notify::new());
    client.on(
        CONNECTION,
        Arc::new(HoldFirstConnecting {
            held: AtomicBool::new(false),
            release: release.clone(),
        }),
    );

    client.connect("http://backend/realtime", options(3, 1000, 8000));
    wait_for_status(&mut connection, ConnectionStatus::Connecting).await;

    let closer = tokio::spawn({
        let client = client.clone();
        async move { client.close().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(client.is_closed());
    assert!(!closer.is_finished(), "close waits for the in-flight dispatch");

    release.notify_one();
    closer.await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let mut statuses = Vec::new();
    while let Ok(event) = connection.try_recv() {
        statuses.push(ConnectionState::from_event(&event).unwrap().status);
    }
    assert_eq!(statuses, vec![ConnectionStatus::Closed]);
    assert_eq!(client.state().status, ConnectionStatus::Closed);
}

#[tokio::test(start_paused = true)]
async fn off_stops_delivery_for_that_name() {
    let transport = ScriptedTransport::new(vec![Attempt::Hold(vec![Frame::new(
        STATS_UPDATE,
        r#"{"order_count":1}"#,
    )])]);
    let client = Client::new(transport.clone());
    let mut stats = listen(&client, STATS_UPDATE);
    let mut connection = listen(&client, CONNECTION);
    client.off(STATS_UPDATE);

    client.connect("http://backend/realtime", StreamOptions::default());
    wait_for_status(&mut connection, ConnectionStatus::Connected).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(stats.try_recv().is_err());
    client.close().await;
}
