//! REST client for the print shop backend.

use std::sync::Arc;
use std::time::Duration;

use log::*;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::csrf::{CsrfTokens, CSRF_FIELD, CSRF_HEADER};
use crate::envelope::{decode_data, decode_envelope};
use crate::error::{csrf_error, http_error, CsrfErrorKind, Error, HttpErrorKind};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Path of the CSRF token endpoint, relative to the base URL.
    pub csrf_path: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("printshop-console/{}", env!("CARGO_PKG_VERSION")),
            csrf_path: "api/csrf_token.php".to_string(),
        }
    }
}

/// One file in a multipart upload.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Multipart body; turned into a `reqwest` form once the CSRF token is known.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn file(mut self, field: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        self.files.push(FilePart {
            field: field.to_string(),
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            bytes,
        });
        self
    }

    fn into_form(self, csrf_token: &str) -> Result<Form, Error> {
        let mut form = Form::new().text(CSRF_FIELD, csrf_token.to_string());
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        for file in self.files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime)?;
            form = form.part(file.field, part);
        }
        Ok(form)
    }
}

/// Body of a mutating request.
#[derive(Debug, Clone)]
pub enum Body {
    Json(Value),
    Multipart(MultipartBody),
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    config: HttpClientConfig,
}

impl ApiClientBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            config: HttpClientConfig::default(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    pub fn with_csrf_path(mut self, csrf_path: &str) -> Self {
        self.config.csrf_path = csrf_path.to_string();
        self
    }

    /// Build the configured client. Cookies (the PHP session) are kept in a
    /// jar shared by every request.
    pub fn build(self) -> Result<ApiClient, Error> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            http_error(
                HttpErrorKind::BuilderFailed,
                &format!("invalid base URL {}: {e}", self.base_url),
            )
        })?;

        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        let csrf = CsrfTokens::new(join(&self.base_url, &self.config.csrf_path));

        Ok(ApiClient {
            http,
            jar,
            base,
            base_url: self.base_url,
            csrf,
        })
    }
}

/// REST client: JSON envelope decoding, cookie session and CSRF discipline.
pub struct ApiClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    base_url: String,
    csrf: CsrfTokens,
}

impl ApiClient {
    pub fn builder(base_url: &str) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        join(&self.base_url, path)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn csrf(&self) -> &CsrfTokens {
        &self.csrf
    }

    /// `Cookie` header value for the backend origin, used to authenticate the
    /// event stream with the same session as the REST calls.
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// GET a path and decode the envelope's `data` into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let response = self
            .http
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(http_error(HttpErrorKind::Unauthorized, "session expired"));
        }

        let body = response.text().await?;
        decode_data(status, &body)
    }

    /// Send a CSRF-protected request and return the envelope's `data`
    /// (`Value::Null` when there is none).
    ///
    /// A `403` refreshes the token once and fails with
    /// `CsrfErrorKind::Rejected`; the request is not replayed.
    pub async fn mutate(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Body,
    ) -> Result<Value, Error> {
        let token = self.csrf.current(&self.http).await?;

        let request = self
            .http
            .request(method.clone(), self.endpoint(path))
            .query(query)
            .header(CSRF_HEADER, &token);
        let request = match body {
            Body::Json(value) => request.json(&with_token(value, &token)),
            Body::Multipart(parts) => request.multipart(parts.into_form(&token)?),
        };

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            warn!("CSRF token rejected for {method} {path}; refreshing it once");
            if let Err(e) = self.csrf.refresh(&self.http).await {
                warn!("CSRF token refresh failed: {e}");
            }
            return Err(csrf_error(
                CsrfErrorKind::Rejected,
                &format!("{method} {path} answered 403"),
            ));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(http_error(HttpErrorKind::Unauthorized, "session expired"));
        }

        let body = response.text().await?;
        Ok(decode_envelope(status, &body)?.unwrap_or(Value::Null))
    }
}

fn join(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Add the token as a body field. Non-object bodies are wrapped under `data`.
fn with_token(body: Value, token: &str) -> Value {
    let mut object = match body {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("data".to_string(), other);
            wrapped
        }
    };
    object.insert(CSRF_FIELD.to_string(), Value::String(token.to_string()));
    Value::Object(object)
}
