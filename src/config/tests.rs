use std::io::Write;

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.binder.enabled);
    assert_eq!(settings.binder.batch_limit.get(), DEFAULT_BATCH_LIMIT);
    assert_eq!(settings.caches.region_capacity.get(), DEFAULT_REGION_CAPACITY);
    assert!(settings.caches.distribute);
    assert_eq!(
        settings.caches.max_pending_instructions.get(),
        DEFAULT_MAX_PENDING_INSTRUCTIONS
    );
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.caches.distribute = Some(true);

    let overrides = ReplayOverrides {
        logging: LoggingOverrides {
            log_level: Some("debug".to_string()),
            log_json: None,
        },
        distribute: Some(false),
        batch_limit: Some(7),
    };

    raw.apply_replay_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(!settings.caches.distribute);
    assert_eq!(settings.binder.batch_limit.get(), 7);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = LoggingOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_logging_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_batch_limit_is_rejected() {
    let mut raw = RawSettings::default();
    raw.binder.batch_limit = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero batch limit");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "binder.batch_limit",
            ..
        }
    ));
}

#[test]
fn zero_region_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.caches.region_capacity = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "caches.region_capacity",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn config_file_layer_is_applied() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(
        file,
        "[binder]\nbatch_limit = 3\n\n[caches]\nregion_capacity = 16\ndistribute = false"
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "cachebind",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "handlers",
    ]);
    let settings = load(&args).expect("valid settings");

    assert_eq!(settings.binder.batch_limit.get(), 3);
    assert_eq!(settings.caches.region_capacity.get(), 16);
    assert!(!settings.caches.distribute);
}

#[test]
fn missing_config_file_is_an_error() {
    let args = CliArgs::parse_from([
        "cachebind",
        "--config-file",
        "/definitely/not/here/cachebind.toml",
        "handlers",
    ]);

    assert!(matches!(load(&args), Err(LoadError::Build(_))));
}

#[test]
fn parse_handlers_command() {
    let args = CliArgs::parse_from(["cachebind", "handlers"]);
    assert!(matches!(args.command, Some(Command::Handlers(_))));
}

#[test]
fn parse_replay_arguments() {
    let args = CliArgs::parse_from([
        "cachebind",
        "replay",
        "--log-level",
        "warn",
        "--caches-distribute",
        "false",
        "--binder-batch-limit",
        "5",
        "/tmp/events.json",
    ]);

    match args.command.expect("replay command") {
        Command::Replay(replay) => {
            assert_eq!(replay.file, std::path::Path::new("/tmp/events.json"));
            assert_eq!(replay.overrides.logging.log_level.as_deref(), Some("warn"));
            assert_eq!(replay.overrides.distribute, Some(false));
            assert_eq!(replay.overrides.batch_limit, Some(5));
        }
        _ => panic!("wrong command parsed"),
    }
}
