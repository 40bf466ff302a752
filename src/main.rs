use log::{error, info};
use std::process::ExitCode;
use timetable_solver::config::AppConfig;
use timetable_solver::data::SchedulingInput;
use timetable_solver::{CancellationToken, server, solver};

/// Generates one timetable from a JSON snapshot and prints the result.
fn run_offline(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let input: SchedulingInput = serde_json::from_str(&raw)?;
    info!("Loaded scheduling input from {path}.");

    let progress = |percent: u32| log::trace!("Progress: {percent}%");
    let result = solver::generate(&input, Some(&progress), &CancellationToken::new())?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let env = env_logger::Env::default().default_filter_or(config.log_filter.as_str());
    env_logger::Builder::from_env(env).init();

    let outcome = match std::env::args().nth(1) {
        Some(path) => run_offline(&path),
        None => server::run_server(&config).await.map_err(Into::into),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
