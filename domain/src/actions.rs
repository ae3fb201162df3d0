//! User-initiated operations.
//!
//! Every entry point goes through [`run_action`], which turns failures into
//! notices so nothing propagates out of an action handler.

use crate::context::AppContext;
use crate::error::Error;
use crate::notifier::{Notice, Notifier};
use api_client::{paths, ApiClient, DeleteMode, MultipartBody, UploadedFile};
use log::*;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome<T> {
    Completed(T),
    /// The failure was reported to the user.
    Failed,
    /// The CSRF token was rejected and refreshed; the user was asked to retry.
    RetryPrompted,
}

impl<T> ActionOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed(_))
    }
}

/// Await `action`, reporting any failure through `notifier`.
pub async fn run_action<T, F>(notifier: &dyn Notifier, label: &str, action: F) -> ActionOutcome<T>
where
    F: Future<Output = Result<T, Error>>,
{
    match action.await {
        Ok(value) => {
            debug!("{label} completed");
            ActionOutcome::Completed(value)
        }
        Err(e) if e.is_csrf_rejection() => {
            warn!("{label} was rejected by CSRF validation");
            notifier.notify(Notice::warning(e.user_message()));
            ActionOutcome::RetryPrompted
        }
        Err(e) => {
            warn!("{label} failed: {e}");
            notifier.notify(Notice::error(e.user_message()));
            ActionOutcome::Failed
        }
    }
}

/// Staff actions against the backend.
pub struct Actions {
    api: Arc<ApiClient>,
    notifier: Arc<dyn Notifier>,
}

impl Actions {
    pub fn new(api: Arc<ApiClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(ctx.api.clone(), ctx.notifier.clone())
    }

    async fn run<T, F>(&self, label: &str, success: &str, action: F) -> ActionOutcome<T>
    where
        F: Future<Output = Result<T, Error>>,
    {
        let outcome = run_action(self.notifier.as_ref(), label, action).await;
        if outcome.is_completed() {
            self.notifier.notify(Notice::success(success));
        }
        outcome
    }

    pub async fn approve_request(&self, id: i64) -> ActionOutcome<Value> {
        self.run("approve request", "Request approved", async {
            Ok::<_, Error>(self
                .api
                .resource(paths::REQUESTS)
                .transition(id, "approve", json!({}))
                .await?)
        })
        .await
    }

    pub async fn reject_request(&self, id: i64, reason: &str) -> ActionOutcome<Value> {
        self.run("reject request", "Request rejected", async {
            Ok::<_, Error>(self
                .api
                .resource(paths::REQUESTS)
                .transition(id, "reject", json!({ "reason": reason }))
                .await?)
        })
        .await
    }

    pub async fn send_support_reply(&self, conversation_id: i64, message: &str) -> ActionOutcome<Value> {
        self.run("send support reply", "Reply sent", async {
            Ok::<_, Error>(self
                .api
                .resource(paths::SUPPORT_MESSAGES)
                .create(json!({
                    "conversation_id": conversation_id,
                    "message": message,
                }))
                .await?)
        })
        .await
    }

    pub async fn mark_conversation_read(&self, conversation_id: i64) -> ActionOutcome<Value> {
        self.run("mark conversation read", "Conversation marked as read", async {
            Ok::<_, Error>(self
                .api
                .resource(paths::SUPPORT_CONVERSATIONS)
                .transition(conversation_id, "mark_read", json!({}))
                .await?)
        })
        .await
    }

    pub async fn set_order_status(&self, order_id: i64, status: &str) -> ActionOutcome<Value> {
        self.run("update order status", "Order updated", async {
            Ok::<_, Error>(self
                .api
                .resource(paths::ORDERS)
                .update(order_id, json!({ "status": status }))
                .await?)
        })
        .await
    }

    /// Soft delete, restore or permanently delete an order.
    pub async fn delete_order(&self, order_id: i64, mode: DeleteMode) -> ActionOutcome<()> {
        let success = match mode {
            DeleteMode::Soft => "Order moved to trash",
            DeleteMode::Restore => "Order restored",
            DeleteMode::Permanent => "Order deleted",
        };
        self.run("delete order", success, async {
            Ok::<_, Error>(self
                .api
                .resource(paths::ORDERS)
                .delete(order_id, mode)
                .await?)
        })
        .await
    }

    pub async fn restock(&self, item_id: i64, quantity: u32) -> ActionOutcome<Value> {
        self.run("restock item", "Stock updated", async {
            Ok::<_, Error>(self
                .api
                .resource(paths::INVENTORY)
                .update(item_id, json!({ "quantity": quantity }))
                .await?)
        })
        .await
    }

    pub async fn upload_artwork(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> ActionOutcome<UploadedFile> {
        self.run("upload artwork", "Upload complete", async {
            Ok::<_, Error>(self
                .api
                .resource(paths::UPLOADS)
                .upload(MultipartBody::new().file("file", file_name, mime, bytes))
                .await?)
        })
        .await
    }
}
