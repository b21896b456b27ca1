mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use commands::{check, entities, schema};
use context::{DialectArg, RegistryContext};
use output::{GlobalOptions, OutputFormat, OutputManager};

const ENVIRONMENT_HELP: &str = "\
Environment:
  QUERYGATE_REGISTRY  Path to the entity registry TOML file
  RUST_LOG            Log filter, e.g. querygate=debug";

/// Derive and check list-query schemas for registered entities
#[derive(Parser)]
#[command(name = "querygate", version, after_help = ENVIRONMENT_HELP)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Registry file (defaults to the built-in sample registry)
    #[arg(long, env = "QUERYGATE_REGISTRY", global = true)]
    registry: Option<PathBuf>,

    /// Filter grammar dialect
    #[arg(long, value_enum, default_value_t, global = true)]
    dialect: DialectArg,

    /// Output format
    #[arg(long, value_enum, default_value_t, global = true)]
    output: OutputFormat,

    /// Only print errors
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Print the resolved registry and query object
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered entities and their fields
    #[command(after_help = entities::EXAMPLES)]
    Entities,

    /// Print the derived query schema of an entity
    #[command(after_help = schema::EXAMPLES)]
    Schema {
        /// Entity name
        entity: String,
    },

    /// Validate a query object against an entity
    #[command(after_help = check::EXAMPLES)]
    Check(check::CheckArgs),
}

/// Exit status: 0 accepted, 1 query rejected, 2 usage or registry error.
fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Runs the selected command. `Ok(false)` means the command completed but rejected its input.
fn execute(cli: Cli) -> Result<bool> {
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });
    let ctx = RegistryContext::load(cli.registry.as_deref(), cli.dialect.into())?;
    output.verbose(&format!("registry: {}, dialect: {}", ctx.source_label(), ctx.dialect()));

    match cli.command {
        Commands::Entities => entities::handle_entities(&ctx, &output).map(|()| true),
        Commands::Schema { entity } => schema::handle_schema(&ctx, &entity, &output).map(|()| true),
        Commands::Check(args) => check::handle_check(&ctx, args, &output),
    }
}
