use std::process::ExitCode;

fn main() -> ExitCode {
    awebot_cli::run()
}
