//! Recent activity feed.

use crate::render::{format_timestamp, Markup, Rendered, Renderer};
use crate::snapshot::Snapshot;
use api_client::paths;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivityItem {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActivityFeed {
    #[serde(default)]
    pub activities: Vec<ActivityItem>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl ActivityFeed {
    pub fn newest_id(&self) -> Option<i64> {
        self.activities.iter().map(|item| item.id).max()
    }
}

impl Snapshot for ActivityFeed {
    type Key = (Option<i64>, usize);

    const EVENT: &'static str = events::ACTIVITY_UPDATE;
    const ENDPOINT: &'static str = paths::ACTIVITY;

    fn salient(&self) -> Self::Key {
        (self.newest_id(), self.activities.len())
    }
}

#[derive(Debug, Clone)]
pub struct ActivityRenderer {
    anchor: String,
}

impl ActivityRenderer {
    pub const ANCHOR: &'static str = "activity";

    pub fn new() -> Self {
        Self {
            anchor: Self::ANCHOR.to_string(),
        }
    }
}

impl Default for ActivityRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer<ActivityFeed> for ActivityRenderer {
    fn anchor(&self) -> &str {
        &self.anchor
    }

    fn render(&self, feed: &ActivityFeed) -> Rendered {
        let mut list = Markup::new().open("ol", &[("class", "activity-feed")]);
        if feed.activities.is_empty() {
            list = list.element("li", &[("class", "empty")], "No recent activity");
        }
        for item in &feed.activities {
            let class = format!("activity activity-{}", item.kind);
            list = list
                .open("li", &[("class", class.as_str())])
                .element("span", &[("class", "description")], &item.description);
            if let Some(user) = &item.user_name {
                list = list.element("span", &[("class", "user")], user);
            }
            list = list
                .element("time", &[], &format_timestamp(&item.created_at))
                .close("li");
        }

        Rendered {
            html: list.close("ol").into_string(),
            bindings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed(ids: &[i64]) -> ActivityFeed {
        let activities: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "type": "order",
                    "description": format!("Order #{id} placed"),
                    "created_at": "2024-05-01 08:00:00"
                })
            })
            .collect();
        serde_json::from_value(json!({ "activities": activities })).unwrap()
    }

    #[test]
    fn salient_key_tracks_newest_id_and_count() {
        assert_eq!(feed(&[3, 9, 4]).salient(), (Some(9), 3));
        assert_eq!(feed(&[]).salient(), (None, 0));
        assert_ne!(feed(&[3, 4]).salient(), feed(&[3, 5]).salient());
    }

    #[test]
    fn render_escapes_descriptions() {
        let mut snapshot = feed(&[1]);
        snapshot.activities[0].description = "Logo \"v2\" <uploaded>".to_string();
        snapshot.activities[0].kind = "upload\"><b".to_string();

        let rendered = ActivityRenderer::new().render(&snapshot);
        assert!(rendered.html.contains("Logo &quot;v2&quot; &lt;uploaded&gt;"));
        assert!(rendered.html.contains("activity-upload&quot;&gt;&lt;b"));
        assert_eq!(rendered, ActivityRenderer::new().render(&snapshot));
    }
}
