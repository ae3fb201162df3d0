use dashmap::DashMap;
use log::*;
use std::future::Future;

/// Identifies one request issued for a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    view: String,
    sequence: u64,
}

impl RequestTicket {
    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Per-view request ordering: only the newest request issued for a view may
/// apply its result. Older responses arriving late are discarded.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: DashMap<String, u64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request for `view`, superseding any request still in flight.
    pub fn begin(&self, view: &str) -> RequestTicket {
        let mut latest = self.latest.entry(view.to_string()).or_insert(0);
        *latest += 1;
        RequestTicket {
            view: view.to_string(),
            sequence: *latest,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.latest
            .get(&ticket.view)
            .is_some_and(|latest| *latest == ticket.sequence)
    }

    /// Run `request` for `view`. Returns `None` if a newer request for the
    /// same view was started before this one completed.
    pub async fn run<F, T>(&self, view: &str, request: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let ticket = self.begin(view);
        let result = request.await;
        if self.is_current(&ticket) {
            Some(result)
        } else {
            debug!(
                "Discarding stale response for {} (request {})",
                ticket.view, ticket.sequence
            );
            None
        }
    }
}
