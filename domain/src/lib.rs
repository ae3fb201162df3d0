//! Feature modules of the print shop console.
//!
//! Each module keeps one panel (dashboard, activity, requests, support) in
//! sync with the backend: pushes arrive from the `sse` client, pass through a
//! change-detecting [`StateHolder`], and are rendered into a [`Surface`].
//! When the stream gives up, modules poll their REST endpoint instead.
//!
//! This crate re-exports what callers need from `api_client`, `events` and
//! `sse` so the binary does not have to depend on them directly.
pub use api_client::{paths, ApiClient, DeleteMode};
pub use events::{EventHandler, StreamEvent};
pub use sse::{ConnectionState, ConnectionStatus, StreamOptions};

pub mod actions;
pub mod activity;
pub mod context;
pub mod dashboard;
pub mod error;
pub mod heartbeat;
pub mod lifecycle;
pub mod module;
pub mod notifier;
pub mod render;
pub mod requests;
pub mod sequencer;
pub mod snapshot;
pub mod source;
pub mod state_holder;
pub mod support;

pub use actions::{run_action, ActionOutcome, Actions};
pub use context::AppContext;
pub use error::Error;
pub use module::FeatureModule;
pub use notifier::{LogNotifier, Notice, NoticeLevel, Notifier};
pub use render::{DirectorySurface, MemorySurface, Renderer, Surface};
pub use snapshot::Snapshot;
pub use state_holder::{PushOutcome, StateHolder};
