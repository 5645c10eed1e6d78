use crate::error::ConfigError;
use crate::types::RawOptions;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub destination: Vec<DestinationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Retry behaviour of the delivery host.
#[derive(Debug, Deserialize, Clone)]
pub struct HostConfig {
    /// Maximum delivery attempts per message before it is dropped.
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_time_reopen_ms")]
    pub time_reopen_ms: u64,
}

impl HostConfig {
    pub fn time_reopen(&self) -> Duration {
        Duration::from_millis(self.time_reopen_ms)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            time_reopen_ms: default_time_reopen_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DestinationConfig {
    pub id: String,

    pub plugin: String,

    #[serde(flatten)]
    pub options: toml::Value,
}

impl DestinationConfig {
    /// Flattens the destination-specific keys into string-valued raw options.
    pub fn raw_options(&self) -> Result<RawOptions, ConfigError> {
        raw_options_from_toml(&self.options)
    }
}

/// Converts a TOML table of scalars into [`RawOptions`].
pub fn raw_options_from_toml(value: &toml::Value) -> Result<RawOptions, ConfigError> {
    let mut raw = RawOptions::new();
    let Some(table) = value.as_table() else {
        return Ok(raw);
    };
    for (key, value) in table {
        let text = match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            _ => return Err(ConfigError::UnsupportedOptionValue(key.clone())),
        };
        raw.insert(key.clone(), text);
    }
    Ok(raw)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_time_reopen_ms() -> u64 {
    60_000
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"))
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = input.to_string();

    for cap in env_var_pattern().captures_iter(input) {
        let var_name = &cap[1];
        let val = std::env::var(var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
        result = result.replace(&cap[0], &val);
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
