//! HTTP surface of the directory API.
//!
//! [`DirectoryClient`] owns the one place outbound payloads pass through the
//! compatibility shim, and hides the directory's response-shape quirks (by-id
//! responses arrive as a bare object, a one-element list, or a `resource`
//! wrapper; pages arrive under `items` or `resource`). The transport is a
//! trait so tests swap in canned responses without a network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::directory::shim;
use crate::model::{OwnerRecord, RecordKind};

/// Connection settings for the directory API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, no trailing slash.
    pub base_url: String,
    /// Hard per-request timeout; a stuck request must not stall a worker.
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Page size for text searches.
    pub search_page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://scholars.uab.edu/api".to_string(),
            request_timeout: Duration::from_secs(15),
            user_agent: "scholar-harvester/0.1".to_string(),
            search_page_size: 25,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_search_page_size(mut self, per_page: usize) -> Self {
        self.search_page_size = per_page;
        self
    }
}

/// Errors from one request/response cycle.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, timeout, or protocol failure.
    #[error("request to '{path}' failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status.
    #[error("unexpected status {status} from '{path}'")]
    Status { path: String, status: u16 },

    /// Body was not the JSON we expected.
    #[error("invalid JSON from '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Raw JSON exchange with the directory. One implementation speaks HTTP;
/// tests provide their own.
#[async_trait]
pub trait DirectoryTransport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, TransportError>;
    async fn post(&self, path: &str, payload: &Value) -> Result<Value, TransportError>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode(path: &str, response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(|source| TransportError::Request {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| TransportError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl DirectoryTransport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let response = self
            .http
            .get(self.url(path))
            .header("Accept", "application/json, text/html, */*")
            .send()
            .await
            .map_err(|source| TransportError::Request {
                path: path.to_string(),
                source,
            })?;
        Self::decode(path, response).await
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, TransportError> {
        let response = self
            .http
            .post(self.url(path))
            .header("Accept", "application/json, text/html, */*")
            .json(payload)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                path: path.to_string(),
                source,
            })?;
        Self::decode(path, response).await
    }
}

/// One page of user-search candidates.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub candidates: Vec<Value>,
    pub total: usize,
}

/// One page of a linked-record collection, still in raw JSON form.
#[derive(Debug, Clone)]
pub struct LinkedPage {
    pub items: Vec<Value>,
    pub total: usize,
}

/// Typed access to the directory endpoints.
pub struct DirectoryClient {
    transport: Arc<dyn DirectoryTransport>,
    config: ClientConfig,
}

impl DirectoryClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self { transport, config })
    }

    /// Uses a caller-supplied transport; this is how tests drive the client.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn DirectoryTransport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Every outbound write goes through the shim, exactly once.
    async fn post(&self, path: &str, payload: &Value) -> Result<Value, TransportError> {
        let payload = shim::transform(payload);
        self.transport.post(path, &payload).await
    }

    /// Text search over user records.
    pub async fn search_users(
        &self,
        text: &str,
        start_from: usize,
        per_page: usize,
    ) -> Result<SearchPage, TransportError> {
        let payload = json!({
            "params": {"by": "text", "category": "user", "text": text},
            "pagination": {"startFrom": start_from, "perPage": per_page},
        });
        let body = self.post("users", &payload).await?;
        let candidates = body
            .get("resource")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!(text, returned = candidates.len(), "user search page");
        Ok(SearchPage {
            candidates,
            total: reported_total(&body),
        })
    }

    /// Fetches one owner profile by numeric id.
    ///
    /// `Ok(None)` when the response carries no resolvable profile (empty
    /// wrapper, or a profile missing an identifier).
    pub async fn owner_by_numeric_id(&self, id: u64) -> Result<Option<OwnerRecord>, TransportError> {
        self.owner_by_path(&format!("users/{id}")).await
    }

    /// Fetches one owner profile by its stable textual id.
    pub async fn owner_by_stable_id(
        &self,
        stable_id: &str,
    ) -> Result<Option<OwnerRecord>, TransportError> {
        self.owner_by_path(&format!("users/{stable_id}")).await
    }

    async fn owner_by_path(&self, path: &str) -> Result<Option<OwnerRecord>, TransportError> {
        let body = self.transport.get(path).await?;
        Ok(unwrap_single(&body).and_then(OwnerRecord::from_profile))
    }

    /// Fetches one page of a linked-record collection.
    pub async fn linked_page(
        &self,
        kind: RecordKind,
        owner_stable_id: &str,
        start_from: usize,
        per_page: usize,
    ) -> Result<LinkedPage, TransportError> {
        let mut payload = json!({
            "objectId": owner_stable_id,
            "category": "user",
            "pagination": {"startFrom": start_from, "perPage": per_page},
        });
        if kind == RecordKind::Publications {
            payload["favouritesFirst"] = json!(true);
            payload["sort"] = json!("dateDesc");
        }
        let body = self.post(kind.endpoint(), &payload).await?;
        // Both page keys have been in use; first non-empty wins.
        let items = ["items", "resource"]
            .iter()
            .filter_map(|k| body.get(*k).and_then(Value::as_array))
            .find(|a| !a.is_empty())
            .cloned()
            .unwrap_or_default();
        Ok(LinkedPage {
            items,
            total: reported_total(&body),
        })
    }
}

fn reported_total(body: &Value) -> usize {
    body.get("pagination")
        .and_then(|p| p.get("total"))
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize
}

/// By-id responses arrive as a bare object, a one-element list, or a
/// `{resource: [..]}` wrapper; all three unwrap to the inner profile.
fn unwrap_single(body: &Value) -> Option<&Value> {
    match body {
        Value::Array(items) => items.first(),
        Value::Object(map) if map.contains_key("resource") => {
            map.get("resource").and_then(Value::as_array)?.first()
        }
        Value::Object(_) => Some(body),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockTransport;

    fn profile(id: u64, stable: &str) -> Value {
        json!({"objectId": id, "discoveryUrlId": stable, "firstName": "A", "lastName": "B"})
    }

    #[tokio::test]
    async fn posts_are_shimmed_once() {
        let transport = Arc::new(MockTransport::replying(
            json!({"resource": [], "pagination": {"total": 0}}),
        ));
        let client = DirectoryClient::with_transport(ClientConfig::default(), transport.clone());
        client.search_users("jane doe", 0, 25).await.unwrap();

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        let (path, payload) = &posts[0];
        assert_eq!(path, "users");
        // The current-schema payload passes through the shim unchanged.
        assert_eq!(payload["params"]["category"], json!("user"));
        assert!(payload.get("objectType").is_none());
    }

    #[tokio::test]
    async fn by_id_unwraps_all_three_shapes() {
        for body in [
            profile(7, "7-a-b"),
            json!([profile(7, "7-a-b")]),
            json!({"resource": [profile(7, "7-a-b")]}),
        ] {
            let transport = Arc::new(MockTransport::replying(body));
            let client =
                DirectoryClient::with_transport(ClientConfig::default(), transport.clone());
            let owner = client.owner_by_numeric_id(7).await.unwrap().unwrap();
            assert_eq!(owner.stable_id, "7-a-b");
            assert_eq!(owner.numeric_id, 7);
            assert_eq!(transport.gets(), vec!["users/7".to_string()]);
        }
    }

    #[tokio::test]
    async fn empty_wrapper_resolves_to_none() {
        for body in [json!([]), json!({"resource": []}), json!({"objectId": 7})] {
            let transport = Arc::new(MockTransport::replying(body));
            let client = DirectoryClient::with_transport(ClientConfig::default(), transport);
            assert!(client.owner_by_numeric_id(7).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn linked_page_reads_items_or_resource() {
        let under_items = json!({"items": [{"objectId": 1}], "pagination": {"total": 1}});
        let under_resource = json!({"resource": [{"objectId": 2}], "pagination": {"total": 1}});
        for (body, expected) in [(under_items, "1"), (under_resource, "2")] {
            let transport = Arc::new(MockTransport::replying(body));
            let client = DirectoryClient::with_transport(ClientConfig::default(), transport);
            let page = client
                .linked_page(RecordKind::Grants, "450-ac", 0, 25)
                .await
                .unwrap();
            assert_eq!(page.items.len(), 1);
            assert_eq!(page.items[0]["objectId"].to_string(), expected);
        }
    }

    #[tokio::test]
    async fn publications_request_sorts_date_desc() {
        let transport = Arc::new(MockTransport::replying(
            json!({"resource": [], "pagination": {"total": 0}}),
        ));
        let client = DirectoryClient::with_transport(ClientConfig::default(), transport.clone());
        client
            .linked_page(RecordKind::Publications, "450-ac", 0, 25)
            .await
            .unwrap();
        let posts = transport.posts();
        assert_eq!(posts[0].1["sort"], json!("dateDesc"));
        assert_eq!(posts[0].0, "publications/linkedTo");

        client
            .linked_page(RecordKind::Teaching, "450-ac", 0, 50)
            .await
            .unwrap();
        let posts = transport.posts();
        assert!(posts[1].1.get("sort").is_none());
    }
}
