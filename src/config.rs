use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides `backend.base_url`.
pub const API_URL_ENV: &str = "PAPERCAST_API_URL";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Speech synthesis is much slower than the text endpoints.
    #[serde(default = "default_audio_timeout_secs")]
    pub audio_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            audio_timeout_secs: default_audio_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_audio_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    /// Drop summarize/upload responses that arrive after the pipeline has
    /// moved on. `false` applies them anyway (last writer wins).
    #[serde(default = "default_discard_stale")]
    pub discard_stale_responses: bool,
    #[serde(default = "default_fallback_id_prefix")]
    pub fallback_id_prefix: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            discard_stale_responses: default_discard_stale(),
            fallback_id_prefix: default_fallback_id_prefix(),
        }
    }
}

fn default_discard_stale() -> bool {
    true
}
fn default_fallback_id_prefix() -> String {
    "upload_".to_string()
}

impl Config {
    /// Defaults used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

/// Load, override from the environment, and validate the configuration.
///
/// A missing file is not an error: the minimal configuration is used and the
/// environment override still applies.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            config.backend.base_url = url.trim().to_string();
        }
    }

    validate(&mut config)?;
    Ok(config)
}

fn validate(config: &mut Config) -> Result<()> {
    let base_url = config.backend.base_url.trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        bail!(
            "backend.base_url must start with http:// or https:// (got '{}')",
            config.backend.base_url
        );
    }
    config.backend.base_url = base_url;

    if config.backend.timeout_secs == 0 {
        bail!("backend.timeout_secs must be > 0");
    }
    if config.backend.audio_timeout_secs == 0 {
        bail!("backend.audio_timeout_secs must be > 0");
    }

    let prefix = &config.workflow.fallback_id_prefix;
    if prefix.is_empty() {
        bail!("workflow.fallback_id_prefix must not be empty");
    }
    if prefix
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
    {
        bail!(
            "workflow.fallback_id_prefix '{}' must not contain whitespace, '/', '?' or '#'",
            prefix
        );
    }

    Ok(())
}
