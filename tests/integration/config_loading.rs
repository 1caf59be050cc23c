//! Loading configuration files and rejecting invalid ones

use std::io::Write;

use assert_matches::assert_matches;
use sensor_monitoring::{
    config::{ConfigError, parse_config, read_config_file},
    registry::SensorRegistry,
    reporters::ReporterDispatch,
};

fn write_config(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file
}

#[test]
fn test_read_config_file_builds_registry_and_reporters() {
    let source = format!(
        r#"
[general]
status_addr = "127.0.0.1:0"
send_timeout_secs = 3
{}
[[sensors]]
id = "a4-c1-38-00-00-02"
label = "Cellar"
parameters = ["temperature"]
history_capacity = 288
history_min_interval = 300
supplementary_capacity = 720
supplementary_min_interval = 3600

[[reporters]]
type = "console"
ok_interval = "10m"
error_interval = "10m"

[[reporters]]
type = "slack"
url = "https://hooks.slack.com/services/T000/B000/XXXX"
ok_interval = "1d"
error_interval = "30m"
"#,
        crate::helpers::GREENHOUSE
    );
    let file = write_config(&source);

    let config = read_config_file(file.path()).unwrap();
    assert_eq!(config.general.send_timeout_secs, 3);

    let registry = SensorRegistry::from_config(&config.sensors).unwrap();
    assert_eq!(registry.len(), 2);

    let cellar = registry.get("A4C138000002").unwrap();
    assert_eq!(cellar.label, "Cellar");
    assert_eq!(cellar.supplementary.unwrap().capacity, 720);

    let dispatch = ReporterDispatch::from_config(&config.reporters, &config.general).unwrap();
    let names: Vec<_> = dispatch.reporters().iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["console", "slack"]);
}

#[test]
fn test_missing_file_is_reported() {
    let error = read_config_file("/nonexistent/sensor-monitoring.toml").unwrap_err();
    assert!(format!("{error:#}").contains("failed to read config file"));
}

#[test]
fn test_invalid_bounds_are_fatal() {
    let config = parse_config(
        r#"
        [[sensors]]
        id = "AA"
        label = "Attic"
        parameters = ["temperature"]
        history_capacity = 10

        [[sensors.alarms]]
        parameter = "temperature"
        min = 30
        max = 10
        "#,
    )
    .unwrap();

    assert_matches!(
        SensorRegistry::from_config(&config.sensors),
        Err(ConfigError::InvalidBounds { sensor, parameter, .. }) => {
            assert_eq!(sensor, "AA");
            assert_eq!(parameter, "temperature");
        }
    );
}

#[test]
fn test_alarm_on_untracked_parameter_is_fatal() {
    let config = parse_config(
        r#"
        [[sensors]]
        id = "AA"
        label = "Attic"
        parameters = ["temperature"]
        history_capacity = 10

        [[sensors.alarms]]
        parameter = "pressure"
        min = 900
        max = 1100
        "#,
    )
    .unwrap();

    assert_eq!(
        SensorRegistry::from_config(&config.sensors).unwrap_err(),
        ConfigError::UnknownParameter {
            sensor: "AA".into(),
            parameter: "pressure".into()
        }
    );
}

#[test]
fn test_duplicate_sensor_after_normalization_is_fatal() {
    let config = parse_config(
        r#"
        [[sensors]]
        id = "aa:bb"
        label = "One"
        parameters = ["temperature"]
        history_capacity = 10

        [[sensors]]
        id = "AA-BB"
        label = "Two"
        parameters = ["temperature"]
        history_capacity = 10
        "#,
    )
    .unwrap();

    assert_eq!(
        SensorRegistry::from_config(&config.sensors).unwrap_err(),
        ConfigError::DuplicateSensor("AABB".into())
    );
}
