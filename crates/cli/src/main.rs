mod definition;
mod report;

use anyhow::{Context, Result, bail};
use argbind_argparse::ArgumentParser;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use crate::definition::{DEFAULT_DEFINITION_NAME, load_definition, write_default_definition};
use crate::report::{ErrorReport, InvocationReport};

/// Exit status for arguments rejected by the definition.
const USAGE_EXIT_CODE: i32 = 2;

#[derive(Parser)]
#[command(name = "argbind")]
#[command(version, about = "Check command lines against a JSON command definition", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample argbind.json
    Init(InitArgs),

    /// Parse arguments against a command definition and print the bound values
    Check(CheckArgs),

    /// Print the option and parameter metadata of a definition as JSON
    Describe(DescribeArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Replace an existing argbind.json
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct CheckArgs {
    /// Path to the command definition
    #[arg(short, long, default_value = "argbind.json", value_name = "FILE")]
    definition: PathBuf,

    /// Only output JSON (no human-readable output)
    #[arg(long)]
    json: bool,

    /// Arguments to check, given after `--`
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

#[derive(Parser)]
struct DescribeArgs {
    /// Path to the command definition
    #[arg(short, long, default_value = "argbind.json", value_name = "FILE")]
    definition: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Check(args) => check(args),
        Commands::Describe(args) => describe(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    if dir.join(DEFAULT_DEFINITION_NAME).exists() && !args.force {
        bail!("{DEFAULT_DEFINITION_NAME} already exists in {}", dir.display());
    }
    let path = write_default_definition(&dir, args.force)?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {DEFAULT_DEFINITION_NAME} to declare your options and params");
    eprintln!("  2. Run: argbind check -- -s --times 3 widget");

    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    tracing::debug!("executing check command");

    let definition = load_definition(&args.definition)?;
    let mut command = definition.build()?;
    let parser = ArgumentParser::default();

    match parser.parse(&mut command, &args.args) {
        Ok(invocation) => {
            let report = InvocationReport::new(&invocation);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
            Ok(())
        }
        Err(err) => {
            tracing::debug!(kind = err.kind().as_str(), "arguments rejected");
            if args.json {
                println!("{}", serde_json::to_string_pretty(&ErrorReport::new(&err))?);
            } else {
                eprintln!("error: {err}");
            }
            std::process::exit(USAGE_EXIT_CODE);
        }
    }
}

fn describe(args: DescribeArgs) -> Result<()> {
    tracing::debug!("executing describe command");

    let definition = load_definition(&args.definition)?;
    let command = definition.build()?;
    let meta = command.metadata(ArgumentParser::default().converter());
    println!("{}", meta.to_json_pretty());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
