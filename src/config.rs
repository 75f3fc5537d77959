//! Environment-driven configuration.
//!
//! Loaded with figment from raw environment variables (after `.env` is read by
//! dotenvy). Durations accept either bare seconds (`30`) or unit strings
//! understood by fundu (`30s`, `1500ms`, `2m`).

use crate::solutions::singleflight::RefreshPolicy;
use crate::solutions::service::ResolutionOptions;
use anyhow::Context;
use figment::Figment;
use figment::providers::Env;
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Absent means questions and artifacts live in memory only.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    #[serde(default)]
    pub youtube_api_key: Option<String>,
    #[serde(default = "default_youtube_base_url")]
    pub youtube_base_url: String,
    #[serde(default = "default_video_max_results")]
    pub video_max_results: u32,

    /// Per-request timeout applied to both provider HTTP clients.
    #[serde(
        default = "default_provider_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub provider_timeout: Duration,
    #[serde(default = "default_max_concurrent_provider_calls")]
    pub max_concurrent_provider_calls: usize,
    #[serde(
        default = "default_provider_queue_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub provider_queue_timeout: Duration,
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,

    /// JSON file of questions loaded into the in-memory question store.
    #[serde(default)]
    pub questions_seed_path: Option<PathBuf>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Figment::new()
            .merge(Env::raw())
            .extract()
            .context("Failed to load config")
    }

    pub fn resolution_options(&self) -> ResolutionOptions {
        ResolutionOptions {
            max_concurrent_calls: self.max_concurrent_provider_calls,
            queue_timeout: self.provider_queue_timeout,
            video_max_results: self.video_max_results,
            refresh_policy: self.refresh_policy,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_port() -> u16 {
    8000
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_gemini_model() -> String {
    "gemini-pro".to_owned()
}

fn default_gemini_base_url() -> String {
    crate::providers::gemini::DEFAULT_BASE_URL.to_owned()
}

fn default_youtube_base_url() -> String {
    crate::providers::youtube::DEFAULT_BASE_URL.to_owned()
}

fn default_video_max_results() -> u32 {
    5
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent_provider_calls() -> usize {
    8
}

fn default_provider_queue_timeout() -> Duration {
    Duration::from_secs(10)
}

fn parse_duration(input: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(input.trim())
        .map_err(|e| format!("invalid duration {input:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {input:?}: {e}"))
}

/// Accepts an integer number of seconds or a fundu duration string.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
