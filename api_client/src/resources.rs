//! Typed resource operations shared by every backend endpoint.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{ApiClient, Body, MultipartBody};
use crate::error::{response_error, Error, ResponseErrorKind};

/// Backend endpoint paths, relative to the base URL.
pub mod paths {
    pub const DASHBOARD_STATS: &str = "api/dashboard_stats.php";
    pub const ACTIVITY: &str = "api/activity.php";
    pub const REQUESTS: &str = "api/requests.php";
    pub const SUPPORT_CONVERSATIONS: &str = "api/support_conversations.php";
    pub const SUPPORT_MESSAGES: &str = "api/support_messages.php";
    pub const ORDERS: &str = "api/orders.php";
    pub const INVENTORY: &str = "api/inventory.php";
    pub const UPLOADS: &str = "api/upload.php";
}

/// How a `DELETE` treats the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Move to the trash; can be restored.
    Soft,
    Restore,
    Permanent,
}

impl DeleteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeleteMode::Soft => "delete",
            DeleteMode::Restore => "restore",
            DeleteMode::Permanent => "permanent",
        }
    }
}

/// Canonical location of an uploaded file, usable directly as an image source
/// or download link.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedFile {
    #[serde(alias = "path")]
    pub url: String,
}

/// Operations on one backend resource path.
pub struct Resource<'a> {
    client: &'a ApiClient,
    path: &'a str,
}

impl ApiClient {
    pub fn resource<'a>(&'a self, path: &'a str) -> Resource<'a> {
        Resource { client: self, path }
    }
}

impl<'a> Resource<'a> {
    /// `GET` the listing, optionally filtered.
    pub async fn list<T: DeserializeOwned>(&self, filters: &[(&str, String)]) -> Result<T, Error> {
        self.client.get_json(self.path, filters).await
    }

    /// `GET ?id=`
    pub async fn detail<T: DeserializeOwned>(&self, id: i64) -> Result<T, Error> {
        self.client
            .get_json(self.path, &[("id", id.to_string())])
            .await
    }

    /// `POST` a JSON body.
    pub async fn create<T: DeserializeOwned>(&self, body: Value) -> Result<T, Error> {
        let data = self
            .client
            .mutate(Method::POST, self.path, &[], Body::Json(body))
            .await?;
        typed(data)
    }

    /// `PUT ?id=` with a JSON body.
    pub async fn update<T: DeserializeOwned>(&self, id: i64, body: Value) -> Result<T, Error> {
        let data = self
            .client
            .mutate(
                Method::PUT,
                self.path,
                &[("id", id.to_string())],
                Body::Json(body),
            )
            .await?;
        typed(data)
    }

    /// `DELETE ?id=&action=`; soft delete, restore or permanent delete.
    pub async fn delete(&self, id: i64, mode: DeleteMode) -> Result<(), Error> {
        self.client
            .mutate(
                Method::DELETE,
                self.path,
                &[("id", id.to_string()), ("action", mode.as_str().to_string())],
                Body::Json(Value::Null),
            )
            .await?;
        Ok(())
    }

    /// Status transition: `POST {"action": .., "id": .., ..extra}`.
    pub async fn transition<T: DeserializeOwned>(
        &self,
        id: i64,
        action: &str,
        extra: Value,
    ) -> Result<T, Error> {
        let mut body = match extra {
            Value::Object(object) => object,
            _ => serde_json::Map::new(),
        };
        body.insert("action".to_string(), json!(action));
        body.insert("id".to_string(), json!(id));

        let data = self
            .client
            .mutate(Method::POST, self.path, &[], Body::Json(Value::Object(body)))
            .await?;
        typed(data)
    }

    /// Multipart `POST`; the backend answers with the stored file's URL.
    pub async fn upload(&self, body: MultipartBody) -> Result<UploadedFile, Error> {
        let data = self
            .client
            .mutate(Method::POST, self.path, &[], Body::Multipart(body))
            .await?;
        typed(data)
    }
}

fn typed<T: DeserializeOwned>(data: Value) -> Result<T, Error> {
    serde_json::from_value(data).map_err(|e| {
        response_error(
            ResponseErrorKind::Malformed,
            &format!("data does not match the expected shape: {e}"),
        )
    })
}
