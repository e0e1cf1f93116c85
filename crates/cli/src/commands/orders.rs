use std::path::Path;

use serde::Serialize;

use fundy_core::config::AppConfig;
use fundy_store::{JsonlOrderStore, OrderStore};

use crate::bootstrap;
use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct OrdersReport {
    command: &'static str,
    status: &'static str,
    path: String,
    count: usize,
    orders: Vec<OrderRow>,
}

#[derive(Debug, Serialize)]
struct OrderRow {
    project_id: String,
    project_name: String,
    amount: u64,
}

pub fn run(config_path: Option<&Path>, limit: Option<usize>, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(bootstrap::load_options(config_path)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "orders",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "orders",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let store = JsonlOrderStore::new(config.orders.path.clone());
    let records = match runtime.block_on(store.list()) {
        Ok(records) => records,
        Err(error) => {
            return CommandResult::failure("orders", "order_store", error.to_string(), 4);
        }
    };

    // Most recent records are at the end of the file.
    let start = limit.map_or(0, |limit| records.len().saturating_sub(limit));
    let visible = &records[start..];

    let report = OrdersReport {
        command: "orders",
        status: "ok",
        path: config.orders.path.display().to_string(),
        count: visible.len(),
        orders: visible
            .iter()
            .map(|record| OrderRow {
                project_id: record.project_id.clone(),
                project_name: record.project_name.clone(),
                amount: record.amount,
            })
            .collect(),
    };

    if json_output {
        return match serde_json::to_string_pretty(&report) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("orders", "serialization", error.to_string(), 3),
        };
    }

    let mut lines = Vec::new();
    lines.push(format!("order store: {}", report.path));
    lines.push(format!("{} order(s)", report.count));
    for order in &report.orders {
        lines.push(format!(
            "  {} riyals for {} (project {})",
            order.amount, order.project_name, order.project_id
        ));
    }
    CommandResult { exit_code: 0, output: lines.join("\n") }
}
