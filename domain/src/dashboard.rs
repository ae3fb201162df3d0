//! Dashboard statistics panel.

use crate::notifier::Notice;
use crate::render::{format_amount, format_timestamp, Binding, Markup, Rendered, Renderer};
use crate::snapshot::{cents, count, increase, Snapshot};
use api_client::paths;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecentOrder {
    pub id: i64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(deserialize_with = "cents", default)]
    pub total: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardStats {
    #[serde(rename = "total_revenue", deserialize_with = "cents", default)]
    pub revenue_cents: i64,
    #[serde(deserialize_with = "count", default)]
    pub total_orders: u64,
    #[serde(deserialize_with = "count", default)]
    pub low_stock_count: u64,
    #[serde(deserialize_with = "count", default)]
    pub pending_requests: u64,
    #[serde(default)]
    pub recent_orders: Vec<RecentOrder>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl Snapshot for DashboardStats {
    type Key = (i64, u64, u64, u64);

    const EVENT: &'static str = events::STATS_UPDATE;
    const ENDPOINT: &'static str = paths::DASHBOARD_STATS;

    fn salient(&self) -> Self::Key {
        (
            self.revenue_cents,
            self.total_orders,
            self.low_stock_count,
            self.pending_requests,
        )
    }

    fn notices(previous: &Self, next: &Self) -> Vec<Notice> {
        let mut notices = Vec::new();
        if let Some(text) = increase(
            previous.pending_requests,
            next.pending_requests,
            "new pending request",
            "new pending requests",
        ) {
            notices.push(Notice::info(text));
        }
        if let Some(text) = increase(
            previous.low_stock_count,
            next.low_stock_count,
            "more item is low on stock",
            "more items are low on stock",
        ) {
            notices.push(Notice::warning(text));
        }
        notices
    }
}

#[derive(Debug, Clone)]
pub struct DashboardRenderer {
    anchor: String,
}

impl DashboardRenderer {
    pub const ANCHOR: &'static str = "dashboard";

    pub fn new() -> Self {
        Self {
            anchor: Self::ANCHOR.to_string(),
        }
    }
}

impl Default for DashboardRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn stat(label: &str, value: &str) -> Markup {
    Markup::new()
        .open("div", &[("class", "stat")])
        .element("span", &[("class", "stat-label")], label)
        .element("span", &[("class", "stat-value")], value)
        .close("div")
}

impl Renderer<DashboardStats> for DashboardRenderer {
    fn anchor(&self) -> &str {
        &self.anchor
    }

    fn render(&self, stats: &DashboardStats) -> Rendered {
        let mut bindings = Vec::new();
        let mut orders = Markup::new().open("ul", &[("class", "recent-orders")]);

        if stats.recent_orders.is_empty() {
            orders = orders.element("li", &[("class", "empty")], "No recent orders");
        }
        for order in &stats.recent_orders {
            let target = format!("order-{}", order.id);
            orders = orders
                .open("li", &[("data-action-target", target.as_str())])
                .element("span", &[("class", "order-id")], &format!("#{}", order.id))
                .element("span", &[("class", "customer")], &order.customer_name)
                .element("span", &[("class", "amount")], &format_amount(order.total))
                .element("span", &[("class", "status")], &order.status)
                .element("time", &[], &format_timestamp(&order.created_at))
                .close("li");
            bindings.push(Binding::new(target, "open-order"));
        }
        orders = orders.close("ul");

        let html = Markup::new()
            .open("section", &[("class", "dashboard-stats")])
            .append(stat("Revenue", &format_amount(stats.revenue_cents)))
            .append(stat("Orders", &stats.total_orders.to_string()))
            .append(stat("Low stock", &stats.low_stock_count.to_string()))
            .append(stat("Pending requests", &stats.pending_requests.to_string()))
            .append(orders)
            .close("section")
            .into_string();

        Rendered { html, bindings }
    }
}
