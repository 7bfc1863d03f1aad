// =============================================================================
// Configuration loading
// =============================================================================

use admin_dashboard::service::StatsMode;
use admin_dashboard::{CliArgs, ServerConfig};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tempfile::Builder;

fn config_file(extension: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new()
        .suffix(extension)
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_yaml_file_overrides_defaults() {
    let file = config_file(
        ".yaml",
        "http_bind: 0.0.0.0:9000\nlist_stale_secs: 60\nstats_mode: snapshot\ncache_capacity: 16\n",
    );
    let args = CliArgs {
        config: Some(file.path().to_path_buf()),
        ..CliArgs::default()
    };

    let config = ServerConfig::from_args(args).unwrap();
    assert_eq!(config.http_bind_address.port(), 9000);
    assert_eq!(config.list_stale_after, Duration::from_secs(60));
    assert_eq!(config.stats_stale_after, Duration::from_secs(120));
    assert_eq!(config.stats_mode, StatsMode::Snapshot);
    assert_eq!(config.cache_capacity, 16);
}

#[test]
fn test_cli_wins_over_json_file() {
    let file = config_file(".json", r#"{"latency_scale": 2.0, "stats_stale_secs": 10}"#);
    let args = CliArgs::parse_from([
        "admin-dashboard",
        "--config",
        file.path().to_str().unwrap(),
        "--latency-scale",
        "0.5",
    ]);

    let config = ServerConfig::from_args(args).unwrap();
    assert_eq!(config.latency_scale, 0.5);
    assert_eq!(config.stats_stale_after, Duration::from_secs(10));
    assert_eq!(config.query_options().staleness.stats, Duration::from_secs(10));
}

#[test]
fn test_unknown_keys_are_rejected() {
    let file = config_file(".yaml", "workspace_root: /tmp\n");
    let args = CliArgs {
        config: Some(file.path().to_path_buf()),
        ..CliArgs::default()
    };
    let error = ServerConfig::from_args(args).unwrap_err();
    assert!(format!("{error:#}").contains("failed to parse YAML config"));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let file = config_file(".toml", "cache_capacity = 4\n");
    let args = CliArgs {
        config: Some(file.path().to_path_buf()),
        ..CliArgs::default()
    };
    let error = ServerConfig::from_args(args).unwrap_err();
    assert!(error.to_string().contains("unsupported config extension"));
}

#[test]
fn test_zero_shutdown_timeout_fails_fast() {
    let args = CliArgs::parse_from(["admin-dashboard", "--shutdown-timeout-secs", "0"]);
    assert!(ServerConfig::from_args(args).is_err());
}

#[test]
fn test_oversized_latency_scale_fails_fast() {
    let args = CliArgs::parse_from(["admin-dashboard", "--latency-scale", "1e20"]);
    let error = ServerConfig::from_args(args).unwrap_err();
    assert!(error.to_string().contains("latency scale must be at most"));

    let args = CliArgs::parse_from(["admin-dashboard", "--latency-scale", "1000"]);
    assert!(ServerConfig::from_args(args).is_ok());
}
