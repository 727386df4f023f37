//! Replay a JSON command stream against a fresh encounter and print the
//! resulting events as JSON lines.

use clap::Parser;
use encounter_engine::model::EncounterState;
use encounter_engine::{apply_command, default_roll_middlewares, Command, SpellRegistry};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sim_cli")]
#[command(about = "Replay a command stream against a fresh encounter")]
struct Cli {
    /// Path to a JSON file containing an array of commands.
    commands: PathBuf,

    /// RNG seed for the fresh encounter.
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let content = match fs::read_to_string(&cli.commands) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to read {:?}: {e}", cli.commands);
            return ExitCode::FAILURE;
        }
    };
    let commands: Vec<Command> = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to parse command stream: {e}");
            return ExitCode::FAILURE;
        }
    };

    let spells = SpellRegistry::core();
    let middlewares = default_roll_middlewares();
    let mut state = EncounterState::new(cli.seed);

    for cmd in commands {
        let (next_state, events) = match apply_command(state, cmd, &spells, &middlewares) {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("engine error: {e}");
                return ExitCode::FAILURE;
            }
        };
        state = next_state;
        for event in &events {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("failed to serialize event: {e}"),
            }
        }
    }

    ExitCode::SUCCESS
}
