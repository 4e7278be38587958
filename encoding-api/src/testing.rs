//! In-memory [`Transport`] for exercising pipelines without the service.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::{
    error::{ApiError, Result},
    models::Status,
    transport::Transport,
};

/// A request seen by [`RecordingTransport`].
#[derive(Clone, Debug)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Id handed out when the call created a resource.
    pub created_id: Option<String>,
    pub at: Instant,
}

type FailWhen = Box<dyn Fn(&Method, &str) -> bool + Send + Sync>;

/// Records every call and answers like the service would.
///
/// - object `POST` bodies are echoed back with a fresh uuid `id`
/// - `GET .../status` pops the next scripted status, repeating the last one
///   once the script is exhausted (`FINISHED` when nothing was scripted)
/// - everything else answers `null`
pub struct RecordingTransport {
    inner: Mutex<Inner>,
    fail_when: Option<FailWhen>,
}

struct Inner {
    calls: Vec<Call>,
    statuses: VecDeque<Status>,
    last_status: Status,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::with_statuses([])
    }

    pub fn with_statuses(statuses: impl IntoIterator<Item = Status>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                calls: Vec::new(),
                statuses: statuses.into_iter().collect(),
                last_status: Status::Finished,
            }),
            fail_when: None,
        }
    }

    /// Every call matching `predicate` is rejected with a service error.
    pub fn fail_when(
        mut self,
        predicate: impl Fn(&Method, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// `"METHOD path"` for every call, in order.
    pub fn requests(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }

    pub fn status_polls(&self) -> Vec<Instant> {
        self.calls()
            .iter()
            .filter(|c| c.method == Method::GET && c.path.ends_with("/status"))
            .map(|c| c.at)
            .collect()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let mut inner = self.inner.lock().unwrap();
        let mut call = Call {
            method: method.clone(),
            path: path.to_string(),
            body: body.clone(),
            created_id: None,
            at: Instant::now(),
        };

        if self.fail_when.as_ref().is_some_and(|f| f(&method, path)) {
            inner.calls.push(call);
            return Err(ApiError::Service {
                path: path.to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: None,
                message: "injected failure".to_string(),
            });
        }

        let response = if method == Method::GET && path.ends_with("/status") {
            if let Some(status) = inner.statuses.pop_front() {
                inner.last_status = status;
            }
            json!({ "status": inner.last_status })
        } else {
            match body {
                Some(Value::Object(mut created))
                    if method == Method::POST && !path.ends_with("/start") =>
                {
                    let id = uuid::Uuid::new_v4().to_string();
                    created.insert("id".to_string(), json!(id));
                    call.created_id = Some(id);
                    Value::Object(created)
                }
                Some(Value::Array(items)) => Value::Array(items),
                _ => Value::Null,
            }
        };

        inner.calls.push(call);
        Ok(response)
    }
}
