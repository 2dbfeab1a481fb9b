use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    check::{self, CheckArgs},
    decode::{self, DecodeArgs},
    encode::{self, EncodeArgs},
    simulate::{self, SimulateArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "study-sim", about = "Study runner command line tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a study configuration.
    Check(CheckArgs),
    /// Drive a scripted participant through a study.
    Simulate(SimulateArgs),
    /// Encode a JSON document as a handoff payload.
    Encode(EncodeArgs),
    /// Decode handoff payloads into a flat CSV.
    Decode(DecodeArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Check(args) => check::run(&args),
        Command::Simulate(args) => simulate::run(&args),
        Command::Encode(args) => encode::run(&args),
        Command::Decode(args) => decode::run(&args),
    }
}
