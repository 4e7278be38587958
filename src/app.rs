//! Shared entry point of the example binaries.

use encoding_api::{EncodingApi, HttpTransport, Transport};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Settings,
    error::{RemoteStep, Result},
    pipeline::pipe::{Pipeline, RunReport},
    presets::Preset,
};

pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Runs `preset` against the hosted service, configured from the process
/// environment. Ctrl-C stops the wait for the encoding.
pub async fn run_preset(preset: Preset) -> Result<RunReport> {
    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, no longer waiting for the encoding");
            cancel_clone.cancel();
        }
    });

    let result = run_with(
        preset,
        |key| std::env::var(key).ok(),
        |settings| HttpTransport::new(settings.api_url(), settings.api_key()).during("connect"),
        &cancel,
    )
    .await;
    signal.abort();
    result
}

/// Loads and validates settings and the pipeline before `connect` is called,
/// so a configuration error never reaches the service.
pub async fn run_with<T, L, C>(
    preset: Preset,
    lookup: L,
    connect: C,
    cancel: &CancellationToken,
) -> Result<RunReport>
where
    T: Transport,
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&Settings) -> Result<T>,
{
    let settings = Settings::from_lookup(lookup)?;
    let spec = preset(&settings)?;
    log::debug!("{:?}", settings);

    let api = EncodingApi::new(connect(&settings)?);
    Pipeline::new(&api, &settings, &spec).run(cancel).await
}

/// `main` of every example binary.
pub async fn main_for(preset: Preset) {
    init_logging();

    match run_preset(preset).await {
        Ok(report) => {
            log::info!(
                "encoding {} done: {}{}",
                report.encoding_id,
                report.status,
                report
                    .manifest_id
                    .as_deref()
                    .filter(|_| report.manifest_started)
                    .map(|id| format!(", manifest {} started", id))
                    .unwrap_or_default()
            );
        }
        Err(e) => {
            let code = if e.is_config_error() { 2 } else { 1 };
            log::error!("{:#}", anyhow::Error::from(e));
            std::process::exit(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use encoding_api::testing::RecordingTransport;

    use super::*;
    use crate::{config, error::PipelineError, presets};

    fn env() -> HashMap<&'static str, String> {
        config::REQUIRED
            .iter()
            .map(|key| (*key, format!("value-of-{}", key)))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_setting_never_reaches_the_service() {
        let all: [Preset; 3] = [
            presets::progressive_mp4,
            presets::segmented_default_manifest,
            presets::sprites_and_watermark,
        ];
        for preset in all {
            for key in config::REQUIRED {
                let mut vars = env();
                vars.remove(key);

                let fake = Arc::new(RecordingTransport::new());
                let mut connected = false;
                let err = run_with(
                    preset,
                    |k| vars.get(k).cloned(),
                    |_| {
                        connected = true;
                        Ok(Arc::clone(&fake))
                    },
                    &CancellationToken::new(),
                )
                .await
                .unwrap_err();

                assert!(matches!(err, PipelineError::MissingSetting(k) if k == key));
                assert!(err.is_config_error());
                assert!(!connected);
                assert!(fake.calls().is_empty());
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_complete_settings() {
        let vars = env();
        let fake = Arc::new(RecordingTransport::new());
        let report = run_with(
            presets::progressive_mp4,
            |k| vars.get(k).cloned(),
            |settings| {
                assert_eq!(settings.s3_bucket_name(), "value-of-BITMOVIN_S3_BUCKET_NAME");
                Ok(Arc::clone(&fake))
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.status, encoding_api::models::Status::Finished);
        assert!(!fake.calls().is_empty());
    }
}
