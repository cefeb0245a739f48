//! Inspection CLI for a votebox election store.
//!
//! # Responsibility
//! - Open the store named by `VOTEBOX_*` environment variables.
//! - Print the current tally, class labels or version for quick checks.

use std::process::ExitCode;
use votebox_core::{
    all_class_labels, core_version, init_logging_from_config, Election, ElectionConfig,
};

const USAGE: &str = "usage: votebox_cli [tally|classes|version]";

fn main() -> ExitCode {
    let command = std::env::args().nth(1).unwrap_or_else(|| "tally".to_string());
    match run(command.as_str()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: &str) -> Result<(), String> {
    match command {
        "version" => {
            println!("votebox_core version={}", core_version());
            Ok(())
        }
        "classes" => {
            for label in all_class_labels() {
                println!("{label}");
            }
            Ok(())
        }
        "tally" => print_tally(),
        other => Err(format!("unknown command `{other}`\n{USAGE}")),
    }
}

fn print_tally() -> Result<(), String> {
    let config = ElectionConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config).map_err(|err| err.to_string())?;

    let election = Election::open(&config).map_err(|err| err.to_string())?;
    let snapshot = election.snapshot().map_err(|err| err.to_string())?;
    log::info!(
        "event=cli_tally module=cli status=ok sequence={} candidates={}",
        snapshot.sequence,
        snapshot.candidates.len()
    );

    let json = serde_json::to_string_pretty(&snapshot).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}
