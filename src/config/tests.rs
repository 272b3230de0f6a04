use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.toolchain.program, PathBuf::from("pdflatex"));
    assert_eq!(settings.toolchain.timeout, Duration::from_secs(30));
    assert_eq!(settings.jobs.root, PathBuf::from("/tmp/latex-jobs"));
    assert_eq!(settings.jobs.retention, Duration::from_secs(3600));
    assert_eq!(settings.jobs.sweep_interval, Duration::from_secs(600));
    assert_eq!(settings.jobs.max_request_bytes.get(), 10 * 1024 * 1024);
    assert!(settings.auth.api_key.is_none());
    assert_eq!(settings.logging.level, LevelFilter::INFO);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.auth.api_key = Some("from-file".to_string());

    let overrides = Overrides {
        port: Some(4321),
        log_level: Some("debug".to_string()),
        api_key: Some("from-cli".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.auth.api_key.as_deref(), Some("from-cli"));
}

#[test]
fn blank_api_key_is_treated_as_unset() {
    let mut raw = RawSettings::default();
    raw.auth.api_key = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.auth.api_key.is_none());
}

#[test]
fn api_key_keeps_surrounding_whitespace() {
    let mut raw = RawSettings::default();
    raw.auth.api_key = Some("abc ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.auth.api_key.as_deref(), Some("abc "));
}

#[test]
fn api_key_is_redacted_in_debug_output() {
    let auth = AuthSettings {
        api_key: Some("super-secret".to_string()),
    };
    let rendered = format!("{auth:?}");
    assert!(!rendered.contains("super-secret"), "leaked: {rendered}");
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn zero_durations_are_rejected() {
    let mut raw = RawSettings::default();
    raw.toolchain.timeout_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero timeout must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "toolchain.timeout_seconds",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.jobs.retention_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port must fail");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn invalid_host_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.host = Some("not a host".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = Overrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["texpress"]);
    let command = args.command.unwrap_or(Command::Serve);
    assert_eq!(command, Command::Serve);
}

#[test]
fn parse_overrides_after_subcommand() {
    let args = CliArgs::parse_from([
        "texpress",
        "serve",
        "--port",
        "8080",
        "--jobs-root",
        "/var/tmp/jobs",
        "--toolchain-timeout-seconds",
        "5",
    ]);

    assert_eq!(args.command, Some(Command::Serve));
    assert_eq!(args.overrides.port, Some(8080));
    assert_eq!(
        args.overrides.jobs_root.as_deref(),
        Some(std::path::Path::new("/var/tmp/jobs"))
    );
    assert_eq!(args.overrides.toolchain_timeout_seconds, Some(5));
}

#[test]
fn parse_sweep_command() {
    let args = CliArgs::parse_from([
        "texpress",
        "--jobs-retention-seconds",
        "60",
        "sweep",
    ]);

    assert_eq!(args.command, Some(Command::Sweep));
    assert_eq!(args.overrides.jobs_retention_seconds, Some(60));
}
