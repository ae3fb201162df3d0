//! Customer requests (quotes, custom print jobs) awaiting staff action.

use crate::notifier::Notice;
use crate::render::{format_timestamp, Binding, Markup, Rendered, Renderer};
use crate::snapshot::{count, increase, Snapshot};
use api_client::paths;
use serde::Deserialize;

pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomerRequest {
    pub id: i64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestsSnapshot {
    #[serde(deserialize_with = "count", default)]
    pub total: u64,
    #[serde(deserialize_with = "count", default)]
    pub pending: u64,
    #[serde(default)]
    pub requests: Vec<CustomerRequest>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl RequestsSnapshot {
    pub fn newest_id(&self) -> Option<i64> {
        self.requests.iter().map(|request| request.id).max()
    }
}

impl Snapshot for RequestsSnapshot {
    type Key = (u64, u64, Option<i64>);

    const EVENT: &'static str = events::REQUESTS_UPDATE;
    const ENDPOINT: &'static str = paths::REQUESTS;

    fn salient(&self) -> Self::Key {
        (self.total, self.pending, self.newest_id())
    }

    fn notices(previous: &Self, next: &Self) -> Vec<Notice> {
        increase(previous.total, next.total, "new request", "new requests")
            .map(Notice::info)
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RequestsRenderer {
    anchor: String,
}

impl RequestsRenderer {
    pub const ANCHOR: &'static str = "requests";

    pub fn new() -> Self {
        Self {
            anchor: Self::ANCHOR.to_string(),
        }
    }
}

impl Default for RequestsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer<RequestsSnapshot> for RequestsRenderer {
    fn anchor(&self) -> &str {
        &self.anchor
    }

    fn render(&self, snapshot: &RequestsSnapshot) -> Rendered {
        let mut bindings = Vec::new();
        let summary = format!("{} total, {} pending", snapshot.total, snapshot.pending);
        let mut table = Markup::new()
            .open("section", &[("class", "requests")])
            .element("p", &[("class", "summary")], &summary)
            .open("table", &[])
            .open("tbody", &[]);

        for request in &snapshot.requests {
            let row = format!("request-{}", request.id);
            table = table
                .open("tr", &[("data-action-target", row.as_str())])
                .element("td", &[], &format!("#{}", request.id))
                .element("td", &[], &request.customer_name)
                .element("td", &[], &request.service)
                .element("td", &[("class", "status")], &request.status)
                .element("td", &[], &format_timestamp(&request.created_at));
            bindings.push(Binding::new(row, "open-request"));

            if request.status == STATUS_PENDING {
                let approve = format!("approve-{}", request.id);
                let reject = format!("reject-{}", request.id);
                table = table
                    .open("td", &[("class", "actions")])
                    .element("button", &[("data-action-target", approve.as_str())], "Approve")
                    .element("button", &[("data-action-target", reject.as_str())], "Reject")
                    .close("td");
                bindings.push(Binding::new(approve, "approve"));
                bindings.push(Binding::new(reject, "reject"));
            }
            table = table.close("tr");
        }

        Rendered {
            html: table.close("tbody").close("table").close("section").into_string(),
            bindings,
        }
    }
}
