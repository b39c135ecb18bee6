mod operations;
mod run;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use env_logger::Env;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "flamapy")]
#[command(about = "Feature-model analyses on an embedded flamapy engine")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an analysis operation on a feature model
    Run(run::RunArgs),

    /// List operations and the techniques they support
    #[command(alias = "ops")]
    Operations(operations::OperationsArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Run(run_args) => {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| anyhow::anyhow!("Failed to create async runtime: {}", e))?;
            rt.block_on(run::execute(run_args))
        }
        Commands::Operations(operations_args) => operations::execute(operations_args),
    }
}

/// Codes outside 0..=255 report a plain failure
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(exit_status(code)),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}
