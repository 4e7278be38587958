use std::time::Duration;

use encoding_api::ApiError;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),

    #[error("invalid value {value:?} for setting {key}")]
    InvalidSetting { key: &'static str, value: String },

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// A create/start/status call was rejected or never reached the service.
    #[error("{step} failed")]
    Remote {
        step: &'static str,
        #[source]
        source: ApiError,
    },

    /// The encoding itself ended in `ERROR`.
    #[error("encoding {encoding_id} failed")]
    JobFailed { encoding_id: String },

    #[error("gave up waiting for encoding {encoding_id} after {waited:?}")]
    WaitTimedOut {
        encoding_id: String,
        waited: Duration,
    },

    #[error("stopped waiting for encoding {encoding_id}")]
    WaitCancelled { encoding_id: String },
}

impl PipelineError {
    /// Raised before anything was sent to the service.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingSetting(_)
                | PipelineError::InvalidSetting { .. }
                | PipelineError::InvalidPipeline(_)
        )
    }
}

/// Tags a failed service call with the pipeline step that issued it.
pub trait RemoteStep<T> {
    fn during(self, step: &'static str) -> Result<T>;
}

impl<T> RemoteStep<T> for std::result::Result<T, ApiError> {
    fn during(self, step: &'static str) -> Result<T> {
        self.map_err(|source| PipelineError::Remote { step, source })
    }
}
