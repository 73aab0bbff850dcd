use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
    /// How long a connection waits on a locked database file before
    /// surfacing the contention as an error.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tally.db".to_string(),
            max_connections: 5,
            timeout_secs: 30,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Remote interpreter settings. The API key is injected here and held as a
/// secret; it must never appear in code reachable by the operator.
#[derive(Clone, Debug)]
pub struct InferenceConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub inference_api_key: Option<String>,
    pub inference_base_url: Option<String>,
    pub inference_model: Option<String>,
    pub inference_max_attempts: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            inference: InferenceConfig {
                api_key: None,
                base_url: "http://localhost:11434".to_string(),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_attempts: 3,
                backoff_base_ms: 1_000,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Defaults, then optional TOML file, then `TALLY_*` env vars, then
    /// programmatic overrides, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tally.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
            if let Some(busy_timeout_ms) = database.busy_timeout_ms {
                self.database.busy_timeout_ms = busy_timeout_ms;
            }
        }

        if let Some(inference) = patch.inference {
            if let Some(api_key_value) = inference.api_key {
                self.inference.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = inference.base_url {
                self.inference.base_url = base_url;
            }
            if let Some(model) = inference.model {
                self.inference.model = model;
            }
            if let Some(timeout_secs) = inference.timeout_secs {
                self.inference.timeout_secs = timeout_secs;
            }
            if let Some(max_attempts) = inference.max_attempts {
                self.inference.max_attempts = max_attempts;
            }
            if let Some(backoff_base_ms) = inference.backoff_base_ms {
                self.inference.backoff_base_ms = backoff_base_ms;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TALLY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TALLY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("TALLY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TALLY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TALLY_DATABASE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TALLY_DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_u64("TALLY_DATABASE_BUSY_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("TALLY_INFERENCE_API_KEY") {
            self.inference.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TALLY_INFERENCE_BASE_URL") {
            self.inference.base_url = value;
        }
        if let Some(value) = read_env("TALLY_INFERENCE_MODEL") {
            self.inference.model = value;
        }
        if let Some(value) = read_env("TALLY_INFERENCE_TIMEOUT_SECS") {
            self.inference.timeout_secs = parse_u64("TALLY_INFERENCE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("TALLY_INFERENCE_MAX_ATTEMPTS") {
            self.inference.max_attempts = parse_u32("TALLY_INFERENCE_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("TALLY_INFERENCE_BACKOFF_BASE_MS") {
            self.inference.backoff_base_ms = parse_u64("TALLY_INFERENCE_BACKOFF_BASE_MS", &value)?;
        }

        let log_level = read_env("TALLY_LOGGING_LEVEL").or_else(|| read_env("TALLY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TALLY_LOGGING_FORMAT").or_else(|| read_env("TALLY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(api_key) = overrides.inference_api_key {
            self.inference.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.inference_base_url {
            self.inference.base_url = base_url;
        }
        if let Some(model) = overrides.inference_model {
            self.inference.model = model;
        }
        if let Some(max_attempts) = overrides.inference_max_attempts {
            self.inference.max_attempts = max_attempts;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.inference.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "inference.base_url must not be empty".to_string(),
            ));
        }
        if self.inference.model.trim().is_empty() {
            return Err(ConfigError::Validation("inference.model must not be empty".to_string()));
        }
        if self.inference.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "inference.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.inference.backoff_base_ms == 0 {
            return Err(ConfigError::Validation(
                "inference.backoff_base_ms must be at least 1".to_string(),
            ));
        }
        let level = self.logging.level.trim().to_ascii_lowercase();
        if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::Validation(format!(
                "logging.level `{}` is not a valid level",
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    inference: Option<InferencePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
    busy_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct InferencePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
    backoff_base_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("tally.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_pass_validation() {
        AppConfig::default().validate().expect("defaults must be valid");
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite::memory:\"\nbusy_timeout_ms = 250\n\n[inference]\nmodel = \"command-parser\"\napi_key = \"sk-test\"\nmax_attempts = 5\n\n[logging]\nformat = \"json\""
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.inference.model, "command-parser");
        assert_eq!(config.inference.max_attempts, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.inference.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("sk-test".to_string())
        );
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/tally.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn zero_attempt_budget_fails_validation() {
        let mut config = AppConfig::default();
        config.inference.max_attempts = 0;
        let error = config.validate().expect_err("zero attempts must be rejected");
        assert!(error.to_string().contains("max_attempts"));
    }

    #[test]
    fn programmatic_overrides_win_over_defaults() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/tally.toml".into()),
            require_file: false,
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                inference_model: Some("parser-mini".to_string()),
                inference_max_attempts: Some(1),
                ..ConfigOverrides::default()
            },
        })
        .expect("load");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.inference.model, "parser-mini");
        assert_eq!(config.inference.max_attempts, 1);
    }
}
