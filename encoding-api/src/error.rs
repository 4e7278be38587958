use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Failure of a single call against the encoding service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {path} failed")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered, but rejected the request.
    #[error("service rejected {path} ({status}): {message}")]
    Service {
        path: String,
        status: StatusCode,
        code: Option<i64>,
        message: String,
    },

    #[error("unexpected response body from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} returned a resource without an id")]
    MissingId { path: String },
}

impl ApiError {
    pub fn path(&self) -> &str {
        match self {
            ApiError::Http { path, .. }
            | ApiError::Service { path, .. }
            | ApiError::Decode { path, .. }
            | ApiError::MissingId { path } => path,
        }
    }
}
