//! 合成体模的生成与批量处理.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod create;
mod process;

#[derive(Parser, Debug)]
#[command(version, about = "Generate synthetic spinal cord phantoms and compute metrics on them.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More logs (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate phantoms with various values of gray/white matter, noise and smoothing.
    Create(create::CreateArgs),
    /// Compute metrics on every phantom present in two folders, taken as scan and re-scan.
    Process(process::ProcessArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logger(utils::log_level(cli.verbose, cli.quiet))?;
    match &cli.command {
        Command::Create(args) => create::run(args),
        Command::Process(args) => process::run(args),
    }
}
