pub mod ask;
pub mod chat;
pub mod config;
pub mod doctor;
pub mod orders;
pub mod registry;
pub mod seed;

use serde::Serialize;

/// What a command hands back to `main`: the text to print and the process
/// exit code. Status-style commands wrap their message in a one-line JSON
/// envelope so scripts can parse outcomes without scraping prose.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    command: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'a str>,
    message: &'a str,
}

impl CommandResult {
    pub fn success(command: &str, message: impl AsRef<str>) -> Self {
        Self { exit_code: 0, output: envelope(command, "ok", None, message.as_ref()) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl AsRef<str>,
        exit_code: u8,
    ) -> Self {
        Self {
            exit_code,
            output: envelope(command, "error", Some(error_class), message.as_ref()),
        }
    }
}

fn envelope(command: &str, status: &str, error_class: Option<&str>, message: &str) -> String {
    let payload = Envelope { command, status, error_class, message };
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        // Escaping the error by hand keeps the fallback itself valid JSON.
        format!(
            r#"{{"command":"{command}","status":"error","error_class":"serialization","message":"{}"}}"#,
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
