use std::path::Path;

use serde::Serialize;

use fundy_core::config::AppConfig;
use fundy_core::ledger::load_registry;

use crate::bootstrap;
use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct RegistryReport {
    command: &'static str,
    status: &'static str,
    path: String,
    loaded: usize,
    projects: Vec<ProjectRow>,
    skipped: Vec<SkippedRow>,
}

#[derive(Debug, Serialize)]
struct ProjectRow {
    id: String,
    name: String,
    budget: String,
}

#[derive(Debug, Serialize)]
struct SkippedRow {
    line: usize,
    reason: String,
    content: String,
}

pub fn run(config_path: Option<&Path>, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(bootstrap::load_options(config_path)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "registry",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let load = load_registry(&config.registry.path);
    let report = RegistryReport {
        command: "registry",
        status: "ok",
        path: config.registry.path.display().to_string(),
        loaded: load.ledger.len(),
        projects: load
            .ledger
            .projects()
            .iter()
            .map(|project| ProjectRow {
                id: project.id.0.clone(),
                name: project.name.clone(),
                budget: project.budget.to_string(),
            })
            .collect(),
        skipped: load
            .skipped
            .iter()
            .map(|skipped| SkippedRow {
                line: skipped.line_number,
                reason: skipped.reason.to_string(),
                content: skipped.content.clone(),
            })
            .collect(),
    };

    if json_output {
        return match serde_json::to_string_pretty(&report) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => {
                CommandResult::failure("registry", "serialization", error.to_string(), 3)
            }
        };
    }

    let mut lines = Vec::new();
    lines.push(format!("project registry: {}", report.path));
    lines.push(format!(
        "{} project(s) loaded, {} line(s) skipped",
        report.loaded,
        report.skipped.len()
    ));
    for project in &report.projects {
        lines.push(format!("  {:>6}  {}  (budget {})", project.id, project.name, project.budget));
    }
    if !report.skipped.is_empty() {
        lines.push("skipped lines:".to_string());
        for skipped in &report.skipped {
            lines.push(format!("  line {}: {}", skipped.line, skipped.reason));
        }
    }
    CommandResult { exit_code: 0, output: lines.join("\n") }
}
