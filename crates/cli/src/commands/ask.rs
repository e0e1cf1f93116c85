use std::path::Path;

use serde::Serialize;

use fundy_agent::runtime::TurnReport;
use fundy_core::config::AppConfig;

use crate::bootstrap::{self, BootstrapError};
use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct AskReport<'a> {
    command: &'a str,
    status: &'a str,
    #[serde(flatten)]
    turn: &'a TurnReport,
}

pub fn run(config_path: Option<&Path>, text: &str, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(bootstrap::load_options(config_path)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    crate::init_logging(&config);

    let app = match bootstrap::assemble(config) {
        Ok(app) => app,
        Err(BootstrapError::Config(error)) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), 2);
        }
        Err(BootstrapError::ChatClient(error)) => {
            return CommandResult::failure("ask", "front_end_init", error, 3);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let report = runtime.block_on(app.assistant.handle_utterance(text));

    if json_output {
        let payload = AskReport { command: "ask", status: "ok", turn: &report };
        return match serde_json::to_string_pretty(&payload) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => {
                CommandResult::failure("ask", "serialization", error.to_string(), 3)
            }
        };
    }

    let mut lines = Vec::new();
    if let Some(reply) = &report.reply {
        lines.push(format!("assistant> {reply}"));
    }
    lines.push(report.outcome.user_message());
    CommandResult { exit_code: 0, output: lines.join("\n") }
}
