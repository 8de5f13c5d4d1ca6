//! Standalone mutations: delete an entity, upload an attachment, send an email.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dashkit_core::{Entity, EntityId, Notification, Notifier};

use crate::{ApiClient, ApiRequest, FilePart, PartValue, Payload, QueryCache, ServerMessage, TransportError};

/// Delete the entity at `path`, with progress and outcome notifications.
///
/// Returns the deleted item so callers can drop it from local lists.
pub async fn delete_item(
    client: &dyn ApiClient,
    notifier: &dyn Notifier,
    path: &str,
    item: Entity,
) -> Result<Entity, TransportError> {
    notifier.notify(Notification::info("Please wait ..."));

    match client.send(ApiRequest::delete(path)).await {
        Ok(_) => {
            tracing::info!(path, "entity deleted");
            notifier.notify(Notification::success("Deleted successfully"));
            Ok(item)
        }
        Err(err) => {
            // Only list-shaped server messages are surfaced here; a plain string
            // message falls back to the transport error text.
            let title = match err.server_message() {
                Some(ServerMessage::Many(list)) if !list.is_empty() => list[0].clone(),
                _ => err.to_string(),
            };
            tracing::warn!(path, error = %err, "delete failed");
            notifier.notify(Notification::destructive(title));
            Err(err)
        }
    }
}

/// Attachment upload request.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub file: FilePart,
    pub model_id: EntityId,
    /// Owning model name, appended to the endpoint (`{endpoint}/{model}`).
    pub model: String,
    /// Extra form fields; `null` values are skipped.
    pub fields: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub endpoint: String,
    /// Cache key invalidated after a successful upload.
    pub query_key: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            endpoint: "/shared/attachments".to_string(),
            query_key: "files".to_string(),
        }
    }
}

/// Upload a file as multipart form data and invalidate the attachment cache.
pub async fn upload_file(
    client: &dyn ApiClient,
    cache: &QueryCache,
    options: &UploadOptions,
    upload: UploadRequest,
) -> Result<Value, TransportError> {
    let mut parts = vec![
        ("file".to_string(), PartValue::File(upload.file)),
        ("modelId".to_string(), PartValue::Text(upload.model_id.to_string())),
    ];
    parts.extend(
        upload
            .fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), PartValue::from_json(v))),
    );

    let path = format!("{}/{}", options.endpoint, upload.model);
    let body = client
        .send(ApiRequest::post(path.as_str(), Payload::Multipart(parts)))
        .await?;

    cache.invalidate(&options.query_key);
    tracing::info!(path = %path, "file uploaded");
    Ok(body)
}

pub const DEFAULT_EMAIL_ENDPOINT: &str = "/email/send";

/// One address or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        Recipients::One(address.to_string())
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addresses: Vec<String>) -> Self {
        Recipients::Many(addresses)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailParams {
    pub to: Recipients,
    pub subject: String,
    pub body: String,
    /// Sent alongside the standard fields (`cc`, `template`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmailParams {
    pub fn new(to: impl Into<Recipients>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// POST the email as JSON to `endpoint`.
pub async fn send_email(
    client: &dyn ApiClient,
    endpoint: &str,
    params: &EmailParams,
) -> Result<EmailResponse, TransportError> {
    let payload = serde_json::to_value(params).map_err(|e| TransportError::Decode(e.to_string()))?;
    let body = client.send(ApiRequest::post(endpoint, Payload::Json(payload))).await?;

    let response: EmailResponse =
        serde_json::from_value(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    tracing::info!(endpoint, success = response.success, "email sent");
    Ok(response)
}
