pub mod app;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod presets;

pub use config::Settings;
pub use error::{PipelineError, Result};
