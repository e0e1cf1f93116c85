use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fundy_core::config::AppConfig;
use toml::Value;

use crate::bootstrap::load_options;

pub fn run(config_path: Option<&Path>) -> String {
    let config = match AppConfig::load(load_options(config_path)) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = detect_config_path(config_path);
    let file_doc = load_config_file_doc(file_path.as_deref());

    let api_key = if config.rag.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let system_prompt = format!("<{} chars>", config.rag.system_prompt.chars().count());

    let rows: Vec<(&str, String, &[&str])> = vec![
        ("registry.path", config.registry.path.display().to_string(), &["FUNDY_REGISTRY_PATH"]),
        ("orders.path", config.orders.path.display().to_string(), &["FUNDY_ORDERS_PATH"]),
        ("rag.enabled", config.rag.enabled.to_string(), &["FUNDY_RAG_ENABLED"]),
        ("rag.base_url", config.rag.base_url.clone(), &["FUNDY_RAG_BASE_URL"]),
        ("rag.model", config.rag.model.clone(), &["FUNDY_RAG_MODEL"]),
        ("rag.system_prompt", system_prompt, &["FUNDY_RAG_SYSTEM_PROMPT"]),
        ("rag.api_key", api_key.to_string(), &["FUNDY_RAG_API_KEY"]),
        ("rag.timeout_secs", config.rag.timeout_secs.to_string(), &["FUNDY_RAG_TIMEOUT_SECS"]),
        (
            "rag.history_chars",
            config.rag.history_chars.to_string(),
            &["FUNDY_RAG_HISTORY_CHARS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["FUNDY_LOGGING_LEVEL", "FUNDY_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["FUNDY_LOGGING_FORMAT", "FUNDY_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in rows {
        let source = field_source(key_path, env_keys, file_doc.as_ref(), file_path.as_deref());
        lines.push(format!("- {key_path} = {value} (source: {source})"));
    }

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let root = PathBuf::from("fundy.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/fundy.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
