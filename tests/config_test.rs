//! Configuration layering: defaults, TOML file, environment.

use serial_test::serial;
use std::time::Duration;

use astropi_control::config::PanelConfig;
use astropi_control::connection::{resolve_address, AddressSource, SERVER_URL_ENV};
use astropi_control::CaptureError;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    std::io::Write::write_all(&mut file, contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn toml_file_overrides_defaults() {
    let file = write_config(
        r#"
        [server]
        url = "astropi.local:8080"
        request_timeout = "10s"

        [capture]
        poll_interval = "500ms"

        [logging]
        level = "debug"
        format = "json"
        "#,
    );

    let config = PanelConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.server.url, "astropi.local:8080");
    assert_eq!(config.server.request_timeout, Duration::from_secs(10));
    assert_eq!(config.server.connect_timeout, Duration::from_secs(5));
    assert_eq!(config.capture.poll_interval, Duration::from_millis(500));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
}

#[test]
#[serial]
fn environment_overrides_file() {
    let file = write_config("[capture]\npoll_interval = \"5s\"\n");
    std::env::set_var("ASTROPI_CAPTURE__POLL_INTERVAL", "750ms");
    let config = PanelConfig::load(Some(file.path()));
    std::env::remove_var("ASTROPI_CAPTURE__POLL_INTERVAL");

    assert_eq!(config.unwrap().capture.poll_interval, Duration::from_millis(750));
}

#[test]
#[serial]
fn zero_interval_fails_validation() {
    let file = write_config("[capture]\npoll_interval = \"0s\"\n");
    let err = PanelConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, CaptureError::Config(_)));
}

#[test]
#[serial]
fn malformed_file_is_config_error() {
    let file = write_config("[capture\npoll_interval = ");
    let err = PanelConfig::load(Some(file.path())).unwrap_err();
    assert_eq!(err.kind(), "config");
}

#[test]
#[serial]
fn address_precedence() {
    std::env::remove_var(SERVER_URL_ENV);
    let addr = resolve_address(None, Some("astropi.local"));
    assert_eq!(addr.source(), AddressSource::ConfigFile);
    assert_eq!(addr.as_str(), "http://astropi.local:5000/");

    std::env::set_var(SERVER_URL_ENV, "10.0.0.7:6000");
    let from_env = resolve_address(None, Some("astropi.local"));
    let from_cli = resolve_address(Some("https://observatory.example"), Some("astropi.local"));
    let bad_cli = resolve_address(Some("ftp://nope"), Some("astropi.local"));
    std::env::remove_var(SERVER_URL_ENV);

    assert_eq!(from_env.source(), AddressSource::Environment);
    assert_eq!(from_env.as_str(), "http://10.0.0.7:6000/");
    assert_eq!(from_cli.source(), AddressSource::CommandLine);
    assert!(from_cli.is_tls());
    // An invalid flag falls through to the next source
    assert_eq!(bad_cli.source(), AddressSource::Environment);

    let fallback = resolve_address(None, None);
    assert_eq!(fallback.source(), AddressSource::Default);
}
