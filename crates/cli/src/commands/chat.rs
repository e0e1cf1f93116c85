use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;

use fundy_agent::runtime::AssistantRuntime;
use fundy_core::config::AppConfig;

use crate::bootstrap::{self, BootstrapError};
use crate::commands::CommandResult;

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(bootstrap::load_options(config_path)) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
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
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2);
        }
        Err(BootstrapError::ChatClient(error)) => {
            return CommandResult::failure("chat", "front_end_init", error, 3);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match repl(&runtime, &app.assistant) {
        Ok(()) => CommandResult::success("chat", "chat session ended"),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 3),
    }
}

/// Line-oriented loop: one utterance in, reply plus outcome out. `exit`,
/// `quit`, or end-of-input leave the session.
fn repl(runtime: &tokio::runtime::Runtime, assistant: &AssistantRuntime) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    writeln!(stdout, "fundy assistant - type 'exit' to leave")
        .context("writing the chat banner")?;

    loop {
        write!(stdout, "you> ").context("writing the prompt")?;
        stdout.flush().context("flushing the prompt")?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).context("reading an utterance")?;
        if read == 0 {
            break;
        }

        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if utterance.eq_ignore_ascii_case("exit") || utterance.eq_ignore_ascii_case("quit") {
            break;
        }

        let report = runtime.block_on(assistant.handle_utterance(utterance));
        if let Some(reply) = &report.reply {
            writeln!(stdout, "assistant> {reply}").context("writing the reply")?;
        }
        writeln!(stdout, "{}", report.outcome.user_message()).context("writing the outcome")?;
    }

    Ok(())
}
