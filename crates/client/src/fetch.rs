//! Read-side helpers: cached list/single fetches and cancellable fetches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{ApiClient, ApiRequest, QueryCache, TransportError, unwrap_entity, unwrap_list};

/// URLs built from unresolved route parameters are never sent.
fn is_unresolved(url: &str) -> bool {
    url.contains("undefined") || url.contains("null")
}

fn variant_key(url: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let qs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{url}?{}", qs.join("&"))
}

/// Fetch a list and store it in the cache under `key`.
///
/// `url` defaults to `key`. Always hits the network (cached data is considered
/// stale immediately); the cache is there for observers.
pub async fn fetch_list(
    client: &dyn ApiClient,
    cache: &QueryCache,
    key: &str,
    url: Option<&str>,
    query: &[(String, String)],
) -> Result<Vec<Value>, TransportError> {
    let url = url.unwrap_or(key);
    if is_unresolved(url) {
        return Ok(Vec::new());
    }

    let mut request = ApiRequest::get(url);
    request.query = query.to_vec();

    let items = unwrap_list(client.send(request).await?);
    cache.put(key, &variant_key(url, query), Value::Array(items.clone()));
    Ok(items)
}

/// Fetch a single entity and store it in the cache under `key`.
///
/// Returns `default` for unresolved URLs and for empty bodies.
pub async fn fetch_single(
    client: &dyn ApiClient,
    cache: &QueryCache,
    key: &str,
    url: Option<&str>,
    query: &[(String, String)],
    default: Value,
) -> Result<Value, TransportError> {
    let url = url.unwrap_or(key);
    if is_unresolved(url) {
        return Ok(default);
    }

    let mut request = ApiRequest::get(url);
    request.query = query.to_vec();

    let value = match unwrap_entity(client.send(request).await?) {
        Value::Null => default,
        v => v,
    };
    cache.put(key, &variant_key(url, query), value.clone());
    Ok(value)
}

/// Observable state of a [`FetchHandle`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState {
    pub loading: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
        }
    }
}

/// A fetch running in the background, tied to the lifetime of its owner.
///
/// Cancelling (or dropping) the handle aborts the request; once cancelled the
/// observable state is never updated again.
#[derive(Debug)]
pub struct FetchHandle {
    state: watch::Receiver<FetchState>,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

/// Start a fetch on the current tokio runtime.
pub fn spawn_fetch(client: Arc<dyn ApiClient>, request: ApiRequest) -> FetchHandle {
    let (tx, rx) = watch::channel(FetchState::default());
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();

    let task = tokio::spawn(async move {
        let path = request.path.clone();
        let result = client.send(request).await;

        tx.send_if_modified(|state| {
            if flag.load(Ordering::SeqCst) {
                return false;
            }
            state.loading = false;
            match result {
                Ok(body) => state.data = Some(unwrap_entity(body)),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "fetch failed");
                    state.error = Some(err.to_string());
                }
            }
            true
        });
    });

    FetchHandle {
        state: rx,
        cancelled,
        task: Some(task),
    }
}

impl FetchHandle {
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the fetch settles (or is cancelled) and return the final state.
    pub async fn finished(&mut self) -> FetchState {
        let settled = self.state.wait_for(|s| !s.loading).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("fetch cancelled");
        }
    }
}

impl Drop for FetchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
