//! Server-Sent Events (SSE) client for real-time panel updates.
//!
//! This crate maintains one long-lived connection to the backend's realtime
//! endpoint, hands parsed events to registered listeners and recovers from
//! dropped connections.
//!
//! # Architecture
//!
//! - **Single connection per client**: one spawned task owns the stream and
//!   delivers events sequentially, so listeners never run concurrently with
//!   each other.
//! - **Bounded reconnects**: failures back off exponentially up to a ceiling;
//!   a successful connection resets the backoff. Once the configured number
//!   of consecutive failures is exceeded the client gives up and emits a
//!   terminal `connection` event with status `error` so modules can fall back
//!   to polling.
//! - **Synthetic connection events**: every transition (`connecting`,
//!   `connected`, `error`, `closed`) is published as a `connection` event.
//! - **Pluggable transport**: the `Transport` trait opens one connection; the
//!   production implementation wraps `eventsource-client` with its own
//!   reconnection turned off.
//!
//! # Example
//!
//! ```rust,ignore
//! use sse::{Client, EventSourceTransport, StreamOptions};
//!
//! let client = Client::new(Arc::new(EventSourceTransport::new()));
//! client.on(events::STATS_UPDATE, dashboard_holder);
//! client.connect("http://localhost/api/realtime.php", StreamOptions::default());
//! // ...
//! client.close().await;
//! ```
//!
//! # Modules
//!
//! - `client`: the connection loop and listener API
//! - `connection`: connection status and state published to consumers
//! - `reconnect`: reconnect options and the backoff schedule
//! - `transport`: the transport seam and the eventsource-backed transport

pub mod client;
pub mod connection;
pub mod error;
pub mod reconnect;
pub mod transport;

pub use client::Client;
pub use connection::{ConnectionId, ConnectionState, ConnectionStatus};
pub use error::{Error, ErrorKind};
pub use reconnect::{Backoff, StreamOptions};
pub use transport::{EventSourceTransport, Frame, FrameStream, Transport};
