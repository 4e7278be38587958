//! Client for the cloud encoding service.
//!
//! ```text
//!  EncodingApi (typed calls, ids out)
//!        │
//!        ▼
//!  Transport ──► HttpTransport (reqwest, X-Api-Key, response envelope)
//!            └─► RecordingTransport (feature "test-utils")
//! ```

pub mod api;
pub mod error;
pub mod http;
pub mod models;
pub mod paths;
#[cfg(feature = "test-utils")]
pub mod testing;
pub mod transport;

pub use api::EncodingApi;
pub use error::{ApiError, Result};
pub use http::{DEFAULT_BASE_URL, HttpTransport};
pub use transport::Transport;
