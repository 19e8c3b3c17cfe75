//! Gazemap CLI - gaze-saliency dataset building and model training.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let app_config = AppConfig::load();

    let exit_code = match cli.command {
        Commands::Build(args) => {
            let args = commands::build::BuildArgs::with_config(args, &app_config);
            match commands::build::run(&args) {
                Ok(_) => ExitCode::Success,
                Err(e) => {
                    eprintln!("error: {e:#}");
                    ExitCode::Error
                }
            }
        }
        Commands::Train(args) => {
            let args = commands::train::TrainArgs::with_config(args, &app_config);
            match commands::train::run(&args) {
                Ok(_) => ExitCode::Success,
                Err(e) => {
                    eprintln!("error: {e:#}");
                    ExitCode::Error
                }
            }
        }
    };

    exit_code.into()
}
