use std::process::ExitCode;

fn main() -> ExitCode {
    fundy_cli::run()
}
