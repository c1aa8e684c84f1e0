pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::run::RunArgs;

#[derive(Debug, Parser)]
#[command(
    name = "triad",
    about = "Triad quorum plan orchestrator",
    long_about = "Ask three model providers for a module plan, accept it on 2-of-3 agreement, and commit it with a full audit trail.",
    after_help = "Examples:\n  triad run --intent \"add a stock panel\"\n  triad audit <run-id>\n  triad doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one quorum round and commit the agreed plan")]
    Run {
        #[arg(long, help = "Free-text description of the desired change")]
        intent: String,
        #[arg(long = "module", help = "Target module id (defaults to orchestrator.default_module_id)")]
        module_id: Option<String>,
        #[arg(long = "actor", default_value = "cli", help = "Actor recorded on the audit row")]
        actor_id: String,
        #[arg(long = "override", help = "Schema override as JSON: {\"mandatory\":[],\"optional\":[],\"indexes\":[]}")]
        schema_override: Option<String>,
    },
    #[command(about = "Show the audit record of a round")]
    Audit { run_id: String },
    #[command(about = "Show the committed plan of a module")]
    Module { module_id: Option<String> },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, provider credentials, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { intent, module_id, actor_id, schema_override } => {
            commands::run::run(RunArgs { intent, module_id, actor_id, schema_override })
        }
        Command::Audit { run_id } => commands::audit::run(run_id),
        Command::Module { module_id } => commands::module::run(module_id),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
