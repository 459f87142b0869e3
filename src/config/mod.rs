//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{CliArgs, Command, HandlersArgs, LoggingOverrides, ReplayArgs, ReplayOverrides};

const LOCAL_CONFIG_BASENAME: &str = "cachebind";
const ENV_PREFIX: &str = "CACHEBIND";
const DEFAULT_BATCH_LIMIT: usize = 100;
const DEFAULT_REGION_CAPACITY: usize = 500;
const DEFAULT_MAX_PENDING_INSTRUCTIONS: usize = 1000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub binder: BinderSettings,
    pub caches: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct BinderSettings {
    pub enabled: bool,
    pub batch_limit: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub region_capacity: NonZeroUsize,
    pub distribute: bool,
    pub max_pending_instructions: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Handlers(args)) => raw.apply_logging_overrides(&args.logging),
        Some(Command::Replay(args)) => raw.apply_replay_overrides(&args.overrides),
        None => {}
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    binder: RawBinderSettings,
    caches: RawCacheSettings,
}

impl RawSettings {
    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_replay_overrides(&mut self, overrides: &ReplayOverrides) {
        self.apply_logging_overrides(&overrides.logging);
        if let Some(distribute) = overrides.distribute {
            self.caches.distribute = Some(distribute);
        }
        if let Some(limit) = overrides.batch_limit {
            self.binder.batch_limit = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            binder,
            caches,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            binder: build_binder_settings(binder)?,
            caches: build_cache_settings(caches)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_binder_settings(binder: RawBinderSettings) -> Result<BinderSettings, LoadError> {
    let batch_limit = non_zero_usize(
        binder.batch_limit.unwrap_or(DEFAULT_BATCH_LIMIT),
        "binder.batch_limit",
    )?;

    Ok(BinderSettings {
        enabled: binder.enabled.unwrap_or(true),
        batch_limit,
    })
}

fn build_cache_settings(caches: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let region_capacity = non_zero_usize(
        caches.region_capacity.unwrap_or(DEFAULT_REGION_CAPACITY),
        "caches.region_capacity",
    )?;
    let max_pending_instructions = non_zero_usize(
        caches
            .max_pending_instructions
            .unwrap_or(DEFAULT_MAX_PENDING_INSTRUCTIONS),
        "caches.max_pending_instructions",
    )?;

    Ok(CacheSettings {
        region_capacity,
        distribute: caches.distribute.unwrap_or(true),
        max_pending_instructions,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBinderSettings {
    enabled: Option<bool>,
    batch_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    region_capacity: Option<usize>,
    distribute: Option<bool>,
    max_pending_instructions: Option<usize>,
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
