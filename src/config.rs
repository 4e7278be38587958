use std::{
    fmt::{Debug, Formatter},
    time::Duration,
};

use encoding_api::DEFAULT_BASE_URL;

use crate::{
    error::{PipelineError, Result},
    pipeline::waiter::PollPolicy,
};

pub const API_KEY: &str = "BITMOVIN_API_KEY";
pub const S3_BUCKET_NAME: &str = "BITMOVIN_S3_BUCKET_NAME";
pub const S3_ACCESS_KEY: &str = "BITMOVIN_S3_ACCESS_KEY";
pub const S3_SECRET_KEY: &str = "BITMOVIN_S3_SECRET_KEY";

pub const API_URL: &str = "BITMOVIN_API_URL";
pub const POLL_INTERVAL_SECS: &str = "ENCODE_POLL_INTERVAL_SECS";
pub const POLL_MAX_INTERVAL_SECS: &str = "ENCODE_POLL_MAX_INTERVAL_SECS";
pub const WAIT_TIMEOUT_SECS: &str = "ENCODE_WAIT_TIMEOUT_SECS";
pub const ENABLE_SPRITES: &str = "ENCODE_ENABLE_SPRITES";
pub const CLEANUP_ON_FAILURE: &str = "ENCODE_CLEANUP_ON_FAILURE";

pub const REQUIRED: [&str; 4] = [API_KEY, S3_BUCKET_NAME, S3_ACCESS_KEY, S3_SECRET_KEY];

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Everything a run needs from its environment, read once at startup.
#[derive(Clone)]
pub struct Settings {
    api_key: String,
    api_url: String,
    s3_bucket_name: String,
    s3_access_key: String,
    s3_secret_key: String,
    poll_policy: PollPolicy,
    enable_sprites: bool,
    cleanup_on_failure: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as
    /// missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(PipelineError::MissingSetting(key));

        let api_key = required(API_KEY)?;
        let s3_bucket_name = required(S3_BUCKET_NAME)?;
        let s3_access_key = required(S3_ACCESS_KEY)?;
        let s3_secret_key = required(S3_SECRET_KEY)?;

        let api_url = get(API_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let interval = parse_secs(POLL_INTERVAL_SECS, get(POLL_INTERVAL_SECS))?
            .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        if interval.is_zero() {
            return Err(PipelineError::InvalidSetting {
                key: POLL_INTERVAL_SECS,
                value: "0".to_string(),
            });
        }
        let max_interval = parse_secs(POLL_MAX_INTERVAL_SECS, get(POLL_MAX_INTERVAL_SECS))?
            .unwrap_or(interval);
        if max_interval < interval {
            return Err(PipelineError::InvalidSetting {
                key: POLL_MAX_INTERVAL_SECS,
                value: max_interval.as_secs().to_string(),
            });
        }
        let timeout = parse_secs(WAIT_TIMEOUT_SECS, get(WAIT_TIMEOUT_SECS))?;

        let mut poll_policy = if max_interval > interval {
            PollPolicy::backoff(interval, max_interval)
        } else {
            PollPolicy::fixed(interval)
        };
        if let Some(timeout) = timeout {
            poll_policy = poll_policy.with_timeout(timeout);
        }

        Ok(Self {
            api_key,
            api_url,
            s3_bucket_name,
            s3_access_key,
            s3_secret_key,
            poll_policy,
            enable_sprites: parse_flag(ENABLE_SPRITES, get(ENABLE_SPRITES))?,
            cleanup_on_failure: parse_flag(CLEANUP_ON_FAILURE, get(CLEANUP_ON_FAILURE))?,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn s3_bucket_name(&self) -> &str {
        &self.s3_bucket_name
    }

    pub fn s3_access_key(&self) -> &str {
        &self.s3_access_key
    }

    pub fn s3_secret_key(&self) -> &str {
        &self.s3_secret_key
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    pub fn enable_sprites(&self) -> bool {
        self.enable_sprites
    }

    pub fn cleanup_on_failure(&self) -> bool {
        self.cleanup_on_failure
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_url", &self.api_url)
            .field("s3_bucket_name", &self.s3_bucket_name)
            .field("poll_policy", &self.poll_policy)
            .field("enable_sprites", &self.enable_sprites)
            .field("cleanup_on_failure", &self.cleanup_on_failure)
            .finish_non_exhaustive()
    }
}

fn parse_secs(key: &'static str, value: Option<String>) -> Result<Option<Duration>> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| PipelineError::InvalidSetting { key, value: v })
        })
        .transpose()
}

fn parse_flag(key: &'static str, value: Option<String>) -> Result<bool> {
    match value {
        None => Ok(false),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(PipelineError::InvalidSetting { key, value: v }),
        },
    }
}
