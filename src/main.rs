use std::{
    io::{self, Write},
    process,
};

use cachebind::{
    binder::HandlerRegistry,
    config,
    error::AppError,
    infra::{error::InfraError, telemetry},
    replay,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Handlers(config::HandlersArgs::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Handlers(_) => run_handlers(),
        config::Command::Replay(args) => run_replay(settings, args),
    }
}

fn run_handlers() -> Result<(), AppError> {
    let registry = HandlerRegistry::shared().map_err(|err| AppError::Binder(err.into()))?;

    let mut stdout = io::stdout().lock();
    for key in registry.handler_keys() {
        writeln!(stdout, "{key}").map_err(InfraError::from)?;
    }
    Ok(())
}

fn run_replay(settings: config::Settings, args: config::ReplayArgs) -> Result<(), AppError> {
    let path = args.file;

    info!(
        target = "cachebind::replay",
        path = %path.display(),
        "Starting replay"
    );

    let batch = replay::load_batch(&path)?;
    let summary = replay::replay(&settings, batch)?;

    let encoded = serde_json::to_string_pretty(&summary)
        .map_err(|err| AppError::unexpected(format!("failed to encode summary: {err}")))?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{encoded}").map_err(InfraError::from)?;
    Ok(())
}
