use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_read_model_url() -> String {
    "http://localhost:8600".to_string()
}

fn default_case_store_url() -> String {
    "http://localhost:8601".to_string()
}

fn default_profile_url() -> String {
    "http://localhost:8602".to_string()
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

fn default_upstream_retry_limit() -> u32 {
    3
}

fn default_upstream_backoff_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    8
}

fn default_retry_base_ms() -> u64 {
    1_500
}

fn default_retry_cap_ms() -> u64 {
    6_000
}

fn default_success_signal_ms() -> u64 {
    5_000
}

fn default_background_interval_ms() -> u64 {
    30_000
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/caseline")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_enabled_true() -> bool {
    true
}

/// Base URLs of the backend collaborators. The read model and the primary
/// case store are distinct services with independent availability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_read_model_url")]
    pub read_model_url: String,
    #[serde(default = "default_case_store_url")]
    pub case_store_url: String,
    #[serde(default = "default_profile_url")]
    pub profile_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            read_model_url: default_read_model_url(),
            case_store_url: default_case_store_url(),
            profile_url: default_profile_url(),
        }
    }
}

/// Transport tuning for a single lookup call. The retry limit and backoff
/// apply only to transient 5xx responses; 503, 404, and 401 are never
/// retried at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_upstream_retry_limit")]
    pub upstream_retry_limit: u32,
    #[serde(default = "default_upstream_backoff_ms")]
    pub upstream_backoff_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            upstream_retry_limit: default_upstream_retry_limit(),
            upstream_backoff_ms: default_upstream_backoff_ms(),
        }
    }
}

/// Reconciliation tuning. `max_attempts` bounds submission-triggered
/// retries; the background interval drives the periodic re-check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_retry_cap_ms")]
    pub retry_cap_ms: u64,
    #[serde(default = "default_success_signal_ms")]
    pub success_signal_ms: u64,
    #[serde(default = "default_background_interval_ms")]
    pub background_interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base_ms(),
            retry_cap_ms: default_retry_cap_ms(),
            success_signal_ms: default_success_signal_ms(),
            background_interval_ms: default_background_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config = serde_json::from_value(config_value)
            .context("failed to deserialize caseline config")?;

        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let sibling_default = config_base.join("caseline.schema.json");
    if sibling_default.exists() {
        return Ok(sibling_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or a sibling caseline.schema.json"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
