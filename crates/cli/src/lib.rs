pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "awebot",
    about = "AWEbot operator CLI",
    long_about = "Inspect AWEbot configuration, check runtime readiness, apply storage migrations, and route recorded Slack payloads offline.",
    after_help = "Examples:\n  awebot doctor --json\n  awebot config\n  awebot route captured/introcard-yes.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config, Slack credentials, and storage connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending profile-store migrations for the sqlite backend")]
    Migrate,
    #[command(about = "Route a recorded Slack payload without sending anything")]
    Route {
        #[arg(help = "File holding a form-encoded body or a JSON payload")]
        file: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Migrate => commands::migrate::run(),
        Command::Route { file } => commands::route::run(&file),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
