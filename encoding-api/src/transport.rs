use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::Result;

/// One request/response exchange with the encoding service.
///
/// Implementations unwrap the service envelope and hand back only the
/// `result` payload, or `Value::Null` when the call has none.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        (**self).send(method, path, body).await
    }
}
