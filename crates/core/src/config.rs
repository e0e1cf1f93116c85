use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instructions sent to the knowledge service with every chat request.
/// Operators override this via `[rag] system_prompt` or
/// `FUNDY_RAG_SYSTEM_PROMPT`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an ERP assistant for corporate employees. \
You answer questions about company procedures and help with fund requests, in English or Arabic. \
Confirm whether a project name or id exists, compare requested amounts against the project's \
budget, and restate the details you understood. If you do not know the answer, say so. \
Keep replies short and professional.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub orders: OrdersConfig,
    pub rag: RagConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct OrdersConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct RagConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
    pub history_chars: usize,
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
    pub registry_path: Option<PathBuf>,
    pub orders_path: Option<PathBuf>,
    pub rag_enabled: Option<bool>,
    pub rag_base_url: Option<String>,
    pub rag_model: Option<String>,
    pub log_level: Option<String>,
}

/// Inputs to [`AppConfig::load`]: an optional explicit config file, whether
/// that file must exist, and programmatic overrides applied after the
/// environment.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("failed to parse `{path}` as TOML: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("config interpolates `${{{var}}}` but that environment variable is unset")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated `${{...}}` interpolation near `{snippet}`")]
    UnterminatedInterpolation { snippet: String },
    #[error("environment override `{key}` has invalid value `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig { path: PathBuf::from("erp_instructions.txt") },
            orders: OrdersConfig { path: PathBuf::from("orders.jsonl") },
            rag: RagConfig {
                enabled: true,
                base_url: "http://localhost:11434".to_string(),
                model: "mistral".to_string(),
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
                api_key: None,
                timeout_secs: 120,
                history_chars: 6_000,
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
                "logging.format `{other}` is not one of compact, pretty, json"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("fundy.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(registry) = patch.registry {
            if let Some(path) = registry.path {
                self.registry.path = path;
            }
        }

        if let Some(orders) = patch.orders {
            if let Some(path) = orders.path {
                self.orders.path = path;
            }
        }

        if let Some(rag) = patch.rag {
            if let Some(enabled) = rag.enabled {
                self.rag.enabled = enabled;
            }
            if let Some(base_url) = rag.base_url {
                self.rag.base_url = base_url;
            }
            if let Some(model) = rag.model {
                self.rag.model = model;
            }
            if let Some(system_prompt) = rag.system_prompt {
                self.rag.system_prompt = system_prompt;
            }
            if let Some(api_key_value) = rag.api_key {
                self.rag.api_key = Some(secret_value(api_key_value));
            }
            if let Some(timeout_secs) = rag.timeout_secs {
                self.rag.timeout_secs = timeout_secs;
            }
            if let Some(history_chars) = rag.history_chars {
                self.rag.history_chars = history_chars;
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
        if let Some(value) = read_env("FUNDY_REGISTRY_PATH") {
            self.registry.path = PathBuf::from(value);
        }
        if let Some(value) = read_env("FUNDY_ORDERS_PATH") {
            self.orders.path = PathBuf::from(value);
        }

        if let Some(value) = read_env("FUNDY_RAG_ENABLED") {
            self.rag.enabled = parse_bool("FUNDY_RAG_ENABLED", &value)?;
        }
        if let Some(value) = read_env("FUNDY_RAG_BASE_URL") {
            self.rag.base_url = value;
        }
        if let Some(value) = read_env("FUNDY_RAG_MODEL") {
            self.rag.model = value;
        }
        if let Some(value) = read_env("FUNDY_RAG_SYSTEM_PROMPT") {
            self.rag.system_prompt = value;
        }
        if let Some(value) = read_env("FUNDY_RAG_API_KEY") {
            self.rag.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FUNDY_RAG_TIMEOUT_SECS") {
            self.rag.timeout_secs = parse_u64("FUNDY_RAG_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("FUNDY_RAG_HISTORY_CHARS") {
            self.rag.history_chars = parse_usize("FUNDY_RAG_HISTORY_CHARS", &value)?;
        }

        let log_level = read_env("FUNDY_LOGGING_LEVEL").or_else(|| read_env("FUNDY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("FUNDY_LOGGING_FORMAT").or_else(|| read_env("FUNDY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(registry_path) = overrides.registry_path {
            self.registry.path = registry_path;
        }
        if let Some(orders_path) = overrides.orders_path {
            self.orders.path = orders_path;
        }
        if let Some(rag_enabled) = overrides.rag_enabled {
            self.rag.enabled = rag_enabled;
        }
        if let Some(rag_base_url) = overrides.rag_base_url {
            self.rag.base_url = rag_base_url;
        }
        if let Some(rag_model) = overrides.rag_model {
            self.rag.model = rag_model;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_registry(&self.registry)?;
        validate_orders(&self.orders)?;
        validate_rag(&self.rag)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("fundy.toml"), PathBuf::from("config/fundy.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            let snippet: String = tail.chars().take(24).collect();
            return Err(ConfigError::UnterminatedInterpolation { snippet });
        };
        let var = &tail[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &tail[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn validate_registry(registry: &RegistryConfig) -> Result<(), ConfigError> {
    if registry.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "registry.path must point at the ERP instructions file".to_string(),
        ));
    }
    Ok(())
}

fn validate_orders(orders: &OrdersConfig) -> Result<(), ConfigError> {
    if orders.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "orders.path must point at the order store file".to_string(),
        ));
    }
    Ok(())
}

fn validate_rag(rag: &RagConfig) -> Result<(), ConfigError> {
    if rag.timeout_secs == 0 || rag.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "rag.timeout_secs must be in range 1..=600".to_string(),
        ));
    }

    if rag.history_chars > 100_000 {
        return Err(ConfigError::Validation(
            "rag.history_chars must not exceed 100000".to_string(),
        ));
    }

    if rag.enabled {
        let url = rag.base_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "rag.base_url must start with http:// or https:// when rag.enabled is true"
                    .to_string(),
            ));
        }
        if rag.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rag.model is required when rag.enabled is true".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    registry: Option<RegistryPatch>,
    orders: Option<OrdersPatch>,
    rag: Option<RagPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct OrdersPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RagPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    history_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
