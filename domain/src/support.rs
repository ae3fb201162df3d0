//! Support conversations with customers.

use crate::notifier::Notice;
use crate::render::{format_timestamp, Binding, Markup, Rendered, Renderer};
use crate::snapshot::{count, increase, Snapshot};
use api_client::paths;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Conversation {
    pub id: i64,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_id: Option<i64>,
    #[serde(deserialize_with = "count", default)]
    pub unread_count: u64,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupportSnapshot {
    #[serde(deserialize_with = "count", default)]
    pub unread_total: u64,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

impl SupportSnapshot {
    pub fn newest_message_id(&self) -> Option<i64> {
        self.conversations
            .iter()
            .filter_map(|c| c.last_message_id)
            .max()
    }
}

impl Snapshot for SupportSnapshot {
    type Key = (u64, usize, Option<i64>);

    const EVENT: &'static str = events::SUPPORT_UPDATE;
    const ENDPOINT: &'static str = paths::SUPPORT_CONVERSATIONS;

    fn salient(&self) -> Self::Key {
        (
            self.unread_total,
            self.conversations.len(),
            self.newest_message_id(),
        )
    }

    fn notices(previous: &Self, next: &Self) -> Vec<Notice> {
        increase(
            previous.unread_total,
            next.unread_total,
            "new support message",
            "new support messages",
        )
        .map(Notice::info)
        .into_iter()
        .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SupportRenderer {
    anchor: String,
}

impl SupportRenderer {
    pub const ANCHOR: &'static str = "support";

    pub fn new() -> Self {
        Self {
            anchor: Self::ANCHOR.to_string(),
        }
    }
}

impl Default for SupportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer<SupportSnapshot> for SupportRenderer {
    fn anchor(&self) -> &str {
        &self.anchor
    }

    fn render(&self, snapshot: &SupportSnapshot) -> Rendered {
        let mut bindings = Vec::new();
        let mut list = Markup::new()
            .open("section", &[("class", "support")])
            .element(
                "p",
                &[("class", "unread")],
                &format!("{} unread", snapshot.unread_total),
            )
            .open("ul", &[]);

        for conversation in &snapshot.conversations {
            let target = format!("conversation-{}", conversation.id);
            let class = if conversation.unread_count > 0 {
                "conversation unread"
            } else {
                "conversation"
            };
            list = list
                .open("li", &[("class", class), ("data-action-target", target.as_str())])
                .element("strong", &[], &conversation.customer_name)
                .element("span", &[("class", "subject")], &conversation.subject);
            if let Some(message) = &conversation.last_message {
                list = list.element("p", &[("class", "preview")], message);
            }
            if conversation.unread_count > 0 {
                list = list.element(
                    "span",
                    &[("class", "badge")],
                    &conversation.unread_count.to_string(),
                );
            }
            list = list
                .element("time", &[], &format_timestamp(&conversation.updated_at))
                .close("li");
            bindings.push(Binding::new(target, "open-conversation"));
        }

        Rendered {
            html: list.close("ul").close("section").into_string(),
            bindings,
        }
    }
}
