use clap::{Parser, Subcommand, ValueEnum};
use citadel_config::RunMode;
use std::path::PathBuf;

/// `--log-level` values; each maps to an `EnvFilter` directive for the
/// citadel targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    /// Also logs every vertex write
    Trace,
}

impl LogLevel {
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Vertex handling for `load`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Clear every class and create vertices from scratch
    Fresh,
    /// Keep vertices, overwrite by id, rebuild edges
    Upsert,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fresh => RunMode::Fresh,
            ModeArg::Upsert => RunMode::Upsert,
        }
    }
}

#[derive(Parser)]
#[command(name = "citadel")]
#[command(about = "citadel - load the Rick and Morty catalogue into a graph database")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses the config value or defaults to 'info'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short = 'C', long, global = true, env = "CITADEL_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch every resource and load vertices and edges
    Load {
        /// Overrides `run.mode` from the configuration
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// Create the database and classes without loading anything
    Provision,

    /// Print vertex and edge counts per class
    Stats,

    /// Print the effective configuration (password masked)
    Config,
}
