//! CLI command definitions and handlers.

pub mod build;
pub mod train;

use clap::{Parser, Subcommand};

/// Gazemap - gaze-saliency dataset building and model training
#[derive(Parser)]
#[command(name = "gazemap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a sample store from a gaze/caption/image corpus
    Build(build::BuildArgs),
    /// Train or evaluate a saliency model over a sample store
    Train(train::TrainArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Run completed.
    Success,
    /// Run aborted on an error.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::from(0),
            ExitCode::Error => Self::from(1),
        }
    }
}
