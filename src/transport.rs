// src/transport.rs

//! HTTP transport to the complaints backend.
//!
//! One place owns URL building, the Authorization header, response parsing,
//! the `{ "data": ... }` envelope unwrap, and error-message extraction.
//! Everything above this layer works with already-parsed payloads.

use std::time::Duration;

use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, Result};
use crate::models::NewAttachment;
use crate::session::SessionStore;

/// Query-string builder with the backend's filter conventions: parameters
/// whose value is empty or the placeholder `"All"` are dropped, and list
/// parameters repeat the key once per element.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parameter unless its value is empty or `"All"`.
    pub fn push(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        if value.is_empty() || value == "All" {
            return;
        }
        self.pairs.push((key.to_string(), value));
    }

    pub fn push_opt(&mut self, key: &str, value: Option<impl ToString>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    /// Append a list parameter, one pair per element.
    pub fn push_all(&mut self, key: &str, values: &[impl ToString]) {
        for value in values {
            self.push(key, value.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn apply(&self, url: &mut Url) {
        if self.pairs.is_empty() {
            return;
        }
        let mut serializer = url.query_pairs_mut();
        for (key, value) in &self.pairs {
            serializer.append_pair(key, value);
        }
    }
}

/// Thin HTTP client over the backend API. Cheap to clone.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    root: String,
    session: SessionStore,
}

impl Transport {
    pub fn new(config: &ApiConfig, session: SessionStore) -> Result<Self> {
        let root = config.root().to_string();
        // Reject a malformed base URL here instead of on the first request.
        Url::parse(&root)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            root,
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Absolute URL for an API path plus query parameters.
    pub fn url(&self, path: &str, query: &Query) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.root, path))?;
        query.apply(&mut url);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T> {
        let url = self.url(path, query)?;
        self.dispatch(self.client.get(url), path).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = self.url(path, &Query::new())?;
        self.dispatch(self.client.post(url).json(body), path).await
    }

    /// POST whose acknowledgement body the caller does not use.
    pub async fn post_discard(&self, path: &str, body: &Value) -> Result<()> {
        self.post::<Value>(path, body).await.map(|_| ())
    }

    pub async fn patch<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = self.url(path, &Query::new())?;
        self.dispatch(self.client.patch(url).json(body), path).await
    }

    /// Upload files as a multipart form; every file goes under the `files`
    /// field, which is how the backend receives a batch.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
        files: Vec<NewAttachment>,
    ) -> Result<T> {
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime_type)?;
            form = form.part("files", part);
        }
        let url = self.url(path, query)?;
        self.dispatch(self.client.post(url).multipart(form), path)
            .await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        mut request: RequestBuilder,
        path: &str,
    ) -> Result<T> {
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        let text = response.text().await?;

        let payload: Value = if is_json {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        } else {
            Value::String(text)
        };

        if !(200..300).contains(&status) {
            // Login and signup answer 401 for bad credentials; only a
            // rejected token on any other path tears the session down.
            if status == 401 && !is_auth_path(path) && self.session.flag_unauthorized() {
                log::warn!("Backend rejected the session token; credentials cleared");
            }
            let message = error_message(status, &payload);
            let payload = (!payload.is_null()).then_some(payload);
            return Err(ApiError::http(status, message, payload));
        }

        let payload = unwrap_envelope(payload);
        Ok(serde_json::from_value(payload)?)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("root", &self.root).finish()
    }
}

fn is_auth_path(path: &str) -> bool {
    matches!(path, "/api/auth/login" | "/api/auth/signup")
}

/// Success payloads may arrive wrapped as `{ "data": ... }`.
fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Best human-readable message for a failed response, probed in the order
/// the backend's error shapes are actually seen.
fn error_message(status: u16, payload: &Value) -> String {
    if let Value::String(text) = payload {
        if !text.is_empty() {
            return text.clone();
        }
    }
    if let Some(map) = payload.as_object() {
        for key in ["message", "error"] {
            if let Some(Value::String(text)) = map.get(key) {
                if !text.is_empty() {
                    return text.clone();
                }
            }
        }
        for key in ["errors", "fieldViolations"] {
            let first_message = map
                .get(key)
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|item| item.get("message"))
                .and_then(Value::as_str);
            if let Some(text) = first_message {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    format!("HTTP {status}")
}
