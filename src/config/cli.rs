use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the cachebind binary.
#[derive(Debug, Parser)]
#[command(name = "cachebind", version, about = "Cache invalidation event binder")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CACHEBIND_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List the registered cache handlers.
    Handlers(HandlersArgs),
    /// Dispatch a recorded batch of events and print what it invalidated.
    Replay(ReplayArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct HandlersArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReplayOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override whether refresh instructions are forwarded to the farm.
    #[arg(
        long = "caches-distribute",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub distribute: Option<bool>,

    /// Override the maximum events dispatched per batch.
    #[arg(long = "binder-batch-limit", value_name = "COUNT")]
    pub batch_limit: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub overrides: ReplayOverrides,

    /// Event batch to dispatch (`.json` or `.toml`).
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
