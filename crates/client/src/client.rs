//! HTTP client capability.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ApiRequest, Method, PartValue, Payload, TransportError};

/// Anything that can execute an [`ApiRequest`] and return the decoded body.
///
/// Empty response bodies decode to `Value::Null`.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError>;
}

/// Access/refresh token pair issued by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Shared, cloneable token slot.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<AuthTokens>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: AuthTokens) -> Self {
        let store = Self::new();
        store.set(tokens);
        store
    }

    pub fn get(&self) -> Option<AuthTokens> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, tokens: AuthTokens) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(tokens);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn access_token(&self) -> Option<String> {
        self.get().map(|t| t.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get().and_then(|t| t.refresh_token)
    }
}

/// Client configuration, supplied once at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Path of the token refresh endpoint; `None` disables refreshing.
    pub refresh_path: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            refresh_path: Some(Self::DEFAULT_REFRESH_PATH.to_string()),
            headers: Vec::new(),
        }
    }

    /// Read configuration from the environment.
    ///
    /// - `DASHKIT_API_URL` (required)
    /// - `DASHKIT_TIMEOUT_SECS` (default 30)
    /// - `DASHKIT_REFRESH_PATH` (default `/auth/refresh`; empty disables refresh)
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("DASHKIT_API_URL").context("DASHKIT_API_URL is not set")?;
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var("DASHKIT_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("DASHKIT_TIMEOUT_SECS is not a number: {raw:?}"))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(path) = std::env::var("DASHKIT_REFRESH_PATH") {
            config.refresh_path = (!path.is_empty()).then_some(path);
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh_path(mut self, path: Option<String>) -> Self {
        self.refresh_path = path;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

/// reqwest-backed [`ApiClient`].
///
/// Every request carries `Authorization: Bearer <access token>` when a token is
/// stored. A 401 triggers at most one refresh attempt; when it succeeds the
/// original request is replayed once with the new token, otherwise the token
/// store is cleared and [`TransportError::Unauthenticated`] is returned.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: TokenStore,
}

impl HttpClient {
    pub fn new(config: ClientConfig, tokens: TokenStore) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, TransportError> {
        let url = self.config.url(&request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut req = self.http.request(method, &url);

        for (name, value) in &self.config.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        req = match &request.body {
            None => req,
            Some(Payload::Json(value)) => req.json(value),
            Some(Payload::Multipart(parts)) => req.multipart(multipart_form(parts)?),
        };

        tracing::debug!(method = %request.method, url = %url, "sending request");

        req.send().await.map_err(|e| {
            tracing::warn!(method = %request.method, url = %url, error = %e, "request failed");
            TransportError::Network(e.to_string())
        })
    }

    /// Try to obtain a fresh access token. Returns it on success.
    async fn refresh(&self) -> Option<String> {
        let path = self.config.refresh_path.as_deref()?;
        let refresh_token = self.tokens.refresh_token()?;

        let request = ApiRequest::post(path, Payload::Json(Value::Object(Default::default())));
        let response = match self.execute(&request, Some(refresh_token.as_str())).await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                return None;
            }
        };

        let body = match decode(response).await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "token refresh rejected");
                return None;
            }
        };

        let access_token = body.get("access_token")?.as_str()?.to_string();
        let refresh_token = body
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or(Some(refresh_token));

        self.tokens.set(AuthTokens {
            access_token: access_token.clone(),
            refresh_token,
        });
        tracing::info!("access token refreshed");

        Some(access_token)
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn send(&self, request: ApiRequest) -> Result<Value, TransportError> {
        let token = self.tokens.access_token();
        let response = self.execute(&request, token.as_deref()).await?;

        let is_refresh_call = self.config.refresh_path.as_deref() == Some(request.path.as_str());
        if response.status() != reqwest::StatusCode::UNAUTHORIZED
            || is_refresh_call
            || self.config.refresh_path.is_none()
            || self.tokens.refresh_token().is_none()
        {
            return decode(response).await;
        }

        match self.refresh().await {
            Some(token) => {
                let retried = self.execute(&request, Some(token.as_str())).await?;
                decode(retried).await
            }
            None => {
                self.tokens.clear();
                Err(TransportError::Unauthenticated)
            }
        }
    }
}

async fn decode(response: reqwest::Response) -> Result<Value, TransportError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))?;

    if !status.is_success() {
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

fn multipart_form(parts: &[(String, PartValue)]) -> Result<reqwest::multipart::Form, TransportError> {
    let mut form = reqwest::multipart::Form::new();

    for (name, value) in parts {
        form = match value {
            PartValue::Text(text) => form.text(name.clone(), text.clone()),
            PartValue::File(file) => {
                let mut part = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone());
                if let Some(content_type) = &file.content_type {
                    part = part
                        .mime_str(content_type)
                        .map_err(|e| TransportError::Network(format!("invalid content type: {e}")))?;
                }
                form.part(name.clone(), part)
            }
        };
    }

    Ok(form)
}
