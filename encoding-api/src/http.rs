use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{ApiError, Result},
    transport::Transport,
};

pub const DEFAULT_BASE_URL: &str = "https://api.bitmovin.com/v1";

const API_KEY_HEADER: &str = "X-Api-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// [`Transport`] talking JSON over HTTPS to the hosted service.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Http {
                path: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("encoding api: {} {}", method, path);

        let mut request = self
            .client
            .request(method, &url)
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let http_err = |source| ApiError::Http {
            path: path.to_string(),
            source,
        };
        let response = request.send().await.map_err(http_err)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(http_err)?;

        decode_envelope(path, status, &bytes)
    }
}

#[derive(Deserialize)]
struct Envelope {
    status: Option<String>,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeData {
    result: Option<Value>,
    code: Option<i64>,
    message: Option<String>,
    developer_message: Option<String>,
}

/// Unwraps `{"status": ..., "data": {"result": ...}}`, turning error
/// envelopes and non-success HTTP codes into [`ApiError::Service`].
fn decode_envelope(path: &str, status: StatusCode, bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        if status.is_success() {
            return Ok(Value::Null);
        }
        return Err(service_error(path, status, None, None));
    }

    let envelope = match serde_json::from_slice::<Envelope>(bytes) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            return Err(service_error(path, status, None, Some(text)));
        }
        Err(source) => {
            return Err(ApiError::Decode {
                path: path.to_string(),
                source,
            });
        }
    };

    let failed = envelope
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("ERROR"));
    if failed || !status.is_success() {
        let (code, message) = match envelope.data {
            Some(data) => (data.code, data.message.or(data.developer_message)),
            None => (None, None),
        };
        return Err(service_error(path, status, code, message));
    }

    Ok(envelope
        .data
        .and_then(|data| data.result)
        .unwrap_or(Value::Null))
}

fn service_error(
    path: &str,
    status: StatusCode,
    code: Option<i64>,
    message: Option<String>,
) -> ApiError {
    let message = message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
    ApiError::Service {
        path: path.to_string(),
        status,
        code,
        message,
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
