use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use fundy_agent::chat::ChatEngine;
use fundy_agent::runtime::AssistantRuntime;
use fundy_core::config::{AppConfig, ConfigError, LoadOptions};
use fundy_core::ledger::{load_registry, LoadReport};
use fundy_rag::RagClient;
use fundy_store::JsonlOrderStore;

/// Wired-up assistant plus the config and load report it came from.
pub struct Application {
    pub config: AppConfig,
    pub registry_report: LoadReport,
    pub assistant: AssistantRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("knowledge service client could not be built: {0}")]
    ChatClient(String),
}

/// An explicitly named config file must exist; the default locations are
/// optional.
pub fn load_options(config_path: Option<&Path>) -> LoadOptions {
    LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    }
}

/// Builds the assistant: load config, load the ledger, connect the order
/// store, and attach the front-end when it is enabled.
pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    assemble(config)
}

/// Wires an [`Application`] from an already-validated config.
pub fn assemble(config: AppConfig) -> Result<Application, BootstrapError> {
    let registry_report = load_registry(&config.registry.path);

    info!(
        event_name = "bootstrap.ledger_ready",
        projects = registry_report.ledger.len(),
        skipped = registry_report.skipped.len(),
        "project ledger ready"
    );

    let chat: Option<Arc<dyn ChatEngine>> = if config.rag.enabled {
        let client = RagClient::from_config(&config.rag)
            .map_err(|error| BootstrapError::ChatClient(error.to_string()))?;
        Some(Arc::new(client))
    } else {
        None
    };

    let orders = Arc::new(JsonlOrderStore::new(config.orders.path.clone()));
    let ledger = Arc::new(registry_report.ledger.clone());
    let assistant = AssistantRuntime::new(ledger, chat, orders);

    Ok(Application { config, registry_report, assistant })
}
