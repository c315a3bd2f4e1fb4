pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "letterflow",
    about = "Letterflow operator CLI",
    long_about = "Operate the Letterflow approval workflow: migrations, demo data, config inspection, readiness checks, and request status.",
    after_help = "Examples:\n  letterflow doctor --json\n  letterflow seed\n  letterflow status REQ-0f3c..."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo campus (one approved actor per role) into the database")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity, and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show the overall status and step trail of one request")]
    Status {
        #[arg(help = "Request id, e.g. REQ-0f3c...")]
        request_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Status { request_id } => commands::status::run(&request_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
