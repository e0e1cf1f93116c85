use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use fundy_cli::commands::{ask, config, doctor, orders, registry, seed};
use serde_json::Value;

const REGISTRY_FIXTURE: &str = "\
Approved projects:
- Project ID: 223 | Name: Tools | Budget: 8,000 Riyals
- Project ID: 101 | Name: Marketing | Budget: 20,000 Riyals
";

#[test]
fn ask_approves_and_records_within_budget() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry_path = write_registry(&dir, REGISTRY_FIXTURE);
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", registry_path.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
        ],
        || {
            let result = ask::run(None, "Request money for project 223, 500 riyals for tools", true);
            assert_eq!(result.exit_code, 0, "expected successful ask run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "ask");
            assert_eq!(payload["status"], "ok");
            assert!(payload["reply"].is_null(), "no front-end reply when disabled");
            assert_eq!(payload["outcome"]["kind"], "approved");
            assert_eq!(payload["outcome"]["project_id"], "223");
            assert_eq!(payload["outcome"]["project_name"], "tools");
            assert_eq!(payload["outcome"]["amount"], 500);

            let raw = fs::read_to_string(&orders_path).expect("orders file should exist");
            let lines: Vec<&str> = raw.lines().collect();
            assert_eq!(lines.len(), 1, "exactly one order should be recorded");

            let order: Value = serde_json::from_str(lines[0]).expect("order line should be JSON");
            assert_eq!(order["project_id"], "223");
            assert_eq!(order["amount"], 500);
        },
    );
}

#[test]
fn ask_denies_over_budget_without_recording() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry_path = write_registry(&dir, REGISTRY_FIXTURE);
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", registry_path.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
        ],
        || {
            let result = ask::run(None, "Request 9000 riyals for tools", false);
            assert_eq!(result.exit_code, 0, "denial is a normal outcome, not an error");
            assert_eq!(
                result.output,
                "Request denied: 9000 riyals exceeds the budget for project tools."
            );
            assert!(!orders_path.exists(), "denied requests must not touch the order store");
        },
    );
}

#[test]
fn ask_reports_unrecognized_for_free_text() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry_path = write_registry(&dir, REGISTRY_FIXTURE);
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", registry_path.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
        ],
        || {
            let result = ask::run(None, "what is the leave policy", true);
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["outcome"]["kind"], "unrecognized");
        },
    );
}

#[test]
fn registry_reports_loaded_and_skipped_lines() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let fixture = format!("{REGISTRY_FIXTURE}- Project ID: 9 | Name: broken\n");
    let registry_path = write_registry(&dir, &fixture);
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", registry_path.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
        ],
        || {
            let result = registry::run(None, true);
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "registry");
            assert_eq!(payload["status"], "ok");
            assert_eq!(payload["loaded"], 2);
            assert_eq!(payload["projects"].as_array().map(Vec::len), Some(2));

            let skipped = payload["skipped"].as_array().expect("skipped should be an array");
            assert_eq!(skipped.len(), 1);
            assert_eq!(skipped[0]["line"], 4);
        },
    );
}

#[test]
fn orders_limit_keeps_most_recent_records() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry_path = write_registry(&dir, REGISTRY_FIXTURE);
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", registry_path.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
        ],
        || {
            let first = ask::run(None, "Request 500 riyals for tools", false);
            assert_eq!(first.exit_code, 0);
            let second = ask::run(None, "Request 1000 riyals for marketing", false);
            assert_eq!(second.exit_code, 0);

            let all = parse_payload(&orders::run(None, None, true).output);
            assert_eq!(all["count"], 2);
            assert_eq!(all["orders"][0]["amount"], 500);
            assert_eq!(all["orders"][1]["amount"], 1000);

            let latest = parse_payload(&orders::run(None, Some(1), true).output);
            assert_eq!(latest["count"], 1);
            assert_eq!(latest["orders"][0]["project_id"], "101");
        },
    );
}

#[test]
fn doctor_flags_missing_registry_and_skips_disabled_front_end() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let missing = dir.path().join("no-such-registry.txt");
    let missing_str = missing.to_string_lossy().to_string();
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", missing_str.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
        ],
        || {
            let output = doctor::run(None, true);
            let payload = parse_payload(&output);

            assert_eq!(payload["overall_status"], "fail");

            let checks = payload["checks"].as_array().expect("checks should be an array");
            let status_of = |name: &str| {
                checks
                    .iter()
                    .find(|check| check["name"] == name)
                    .map(|check| check["status"].clone())
                    .unwrap_or(Value::Null)
            };

            assert_eq!(status_of("config_validation"), "pass");
            assert_eq!(status_of("registry_load"), "fail");
            assert_eq!(status_of("order_store_access"), "pass");
            assert_eq!(status_of("knowledge_service"), "skipped");
        },
    );
}

#[test]
fn seed_refuses_existing_registry_without_force() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry_path = write_registry(&dir, REGISTRY_FIXTURE);
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", registry_path.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
        ],
        || {
            let refused = seed::run(None, false);
            assert_eq!(refused.exit_code, 3, "expected refusal without --force");
            let payload = parse_payload(&refused.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["error_class"], "already_exists");

            let forced = seed::run(None, true);
            assert_eq!(forced.exit_code, 0, "expected forced overwrite to succeed");
            let payload = parse_payload(&forced.output);
            assert_eq!(payload["status"], "ok");

            let written = fs::read_to_string(&registry_path).expect("registry should be readable");
            assert!(written.contains("- Project ID: 101 | Name: Marketing"));
        },
    );
}

#[test]
fn config_redacts_api_key_and_names_sources() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry_path = write_registry(&dir, REGISTRY_FIXTURE);
    let orders_path = dir.path().join("orders.jsonl");
    let orders_str = orders_path.to_string_lossy().to_string();

    with_env(
        &[
            ("FUNDY_REGISTRY_PATH", registry_path.as_str()),
            ("FUNDY_ORDERS_PATH", orders_str.as_str()),
            ("FUNDY_RAG_ENABLED", "false"),
            ("FUNDY_RAG_API_KEY", "fundy-secret-value"),
        ],
        || {
            let output = config::run(None);

            assert!(output.contains("- rag.api_key = <redacted> (source: env (FUNDY_RAG_API_KEY))"));
            assert!(output.contains("(source: env (FUNDY_REGISTRY_PATH))"));
            assert!(output.contains("- rag.enabled = false"));
            assert!(!output.contains("fundy-secret-value"), "secret must never be printed");
        },
    );
}

fn write_registry(dir: &tempfile::TempDir, contents: &str) -> String {
    let path = dir.path().join("erp_instructions.txt");
    fs::write(&path, contents).expect("registry fixture should be written");
    path.to_string_lossy().to_string()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FUNDY_REGISTRY_PATH",
        "FUNDY_ORDERS_PATH",
        "FUNDY_RAG_ENABLED",
        "FUNDY_RAG_BASE_URL",
        "FUNDY_RAG_MODEL",
        "FUNDY_RAG_SYSTEM_PROMPT",
        "FUNDY_RAG_API_KEY",
        "FUNDY_RAG_TIMEOUT_SECS",
        "FUNDY_RAG_HISTORY_CHARS",
        "FUNDY_LOGGING_LEVEL",
        "FUNDY_LOGGING_FORMAT",
        "FUNDY_LOG_LEVEL",
        "FUNDY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
