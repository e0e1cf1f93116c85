use std::fs;
use std::path::Path;

use serde::Serialize;

use fundy_core::config::AppConfig;
use fundy_core::ledger::parse_registry;
use fundy_rag::RagClient;

use crate::bootstrap::load_options;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<&Path>, json_output: bool) -> String {
    let report = build_report(config_path);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config_path: Option<&Path>) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(load_options(config_path)) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_registry(&config));
            checks.push(check_order_store(&config));
            checks.push(check_knowledge_service(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["registry_load", "order_store_access", "knowledge_service"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let skipped = checks.iter().any(|check| check.status == CheckStatus::Skipped);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else if skipped {
        "doctor: readiness checks passed (some skipped)".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_registry(config: &AppConfig) -> DoctorCheck {
    let path = &config.registry.path;
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            return DoctorCheck {
                name: "registry_load",
                status: CheckStatus::Fail,
                details: format!("could not read registry at `{}`: {error}", path.display()),
            };
        }
    };

    let report = parse_registry(&raw);
    if report.ledger.is_empty() {
        return DoctorCheck {
            name: "registry_load",
            status: CheckStatus::Fail,
            details: format!(
                "no project lines parsed from `{}` ({} line(s) skipped)",
                path.display(),
                report.skipped.len()
            ),
        };
    }

    DoctorCheck {
        name: "registry_load",
        status: CheckStatus::Pass,
        details: format!(
            "{} project(s) loaded from `{}`, {} line(s) skipped",
            report.ledger.len(),
            path.display(),
            report.skipped.len()
        ),
    }
}

fn check_order_store(config: &AppConfig) -> DoctorCheck {
    let path = &config.orders.path;
    let result = fs::OpenOptions::new().create(true).append(true).open(path);

    match result {
        Ok(_) => DoctorCheck {
            name: "order_store_access",
            status: CheckStatus::Pass,
            details: format!("append access confirmed for `{}`", path.display()),
        },
        Err(error) => DoctorCheck {
            name: "order_store_access",
            status: CheckStatus::Fail,
            details: format!("could not open `{}` for append: {error}", path.display()),
        },
    }
}

fn check_knowledge_service(config: &AppConfig) -> DoctorCheck {
    if !config.rag.enabled {
        return DoctorCheck {
            name: "knowledge_service",
            status: CheckStatus::Skipped,
            details: "front-end disabled in config".to_string(),
        };
    }

    let client = match RagClient::from_config(&config.rag) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "knowledge_service",
                status: CheckStatus::Fail,
                details: format!("client could not be built: {error}"),
            };
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "knowledge_service",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    if runtime.block_on(client.is_available()) {
        DoctorCheck {
            name: "knowledge_service",
            status: CheckStatus::Pass,
            details: format!("reachable at `{}`", config.rag.base_url),
        }
    } else {
        DoctorCheck {
            name: "knowledge_service",
            status: CheckStatus::Fail,
            details: format!(
                "no response from `{}`; is the model server running?",
                config.rag.base_url
            ),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
