//! Shared test doubles. Compiled only for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::directory::client::{DirectoryTransport, TransportError};

type GetHandler = Box<dyn Fn(&str) -> Result<Value, TransportError> + Send + Sync>;
type PostHandler = Box<dyn Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync>;

/// Scripted [`DirectoryTransport`] recording every call it serves.
pub(crate) struct MockTransport {
    on_get: GetHandler,
    on_post: PostHandler,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub(crate) fn new(
        on_get: impl Fn(&str) -> Result<Value, TransportError> + Send + Sync + 'static,
        on_post: impl Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_get: Box::new(on_get),
            on_post: Box::new(on_post),
            gets: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the same body to every GET and POST.
    pub(crate) fn replying(body: Value) -> Self {
        let get_body = body.clone();
        Self::new(
            move |_| Ok(get_body.clone()),
            move |_, _| Ok(body.clone()),
        )
    }

    pub(crate) fn status_error(path: &str, status: u16) -> TransportError {
        TransportError::Status {
            path: path.to_string(),
            status,
        }
    }

    pub(crate) fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    pub(crate) fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryTransport for MockTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.gets.lock().unwrap().push(path.to_string());
        (self.on_get)(path)
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, TransportError> {
        self.posts
            .lock()
            .unwrap()
            .push((path.to_string(), payload.clone()));
        (self.on_post)(path, payload)
    }
}

/// Minimal owner profile JSON with both identifiers present.
pub(crate) fn profile_json(numeric_id: u64, stable_id: &str, first: &str, last: &str) -> Value {
    serde_json::json!({
        "objectId": numeric_id,
        "discoveryUrlId": stable_id,
        "firstName": first,
        "lastName": last,
        "positions": [{"department": "Med - Preventive Medicine", "position": "Professor"}]
    })
}
