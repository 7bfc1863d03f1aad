use crate::query::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_LIST_STALE_AFTER, DEFAULT_STATS_STALE_AFTER, QueryOptions,
    StalenessPolicy,
};
use crate::service::{LatencyProfile, StatsMode};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
const MAX_LATENCY_SCALE: f64 = 1000.0;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    /// Multiplier applied to every simulated service delay; 0 disables them.
    pub latency_scale: f64,
    pub list_stale_after: Duration,
    pub stats_stale_after: Duration,
    pub cache_capacity: usize,
    pub stats_mode: StatsMode,
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_address: default_bind(),
            latency_scale: 1.0,
            list_stale_after: DEFAULT_LIST_STALE_AFTER,
            stats_stale_after: DEFAULT_STATS_STALE_AFTER,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            stats_mode: StatsMode::default(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

fn default_bind() -> SocketAddr {
    DEFAULT_HTTP_BIND
        .parse()
        .expect("default bind address valid")
}

impl ServerConfig {
    /// Command-line and environment values win over the config file.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            latency_scale: cli_latency_scale,
            list_stale_secs: cli_list_stale_secs,
            stats_stale_secs: cli_stats_stale_secs,
            cache_capacity: cli_cache_capacity,
            stats_mode: cli_stats_mode,
            shutdown_timeout_secs: cli_shutdown_timeout_secs,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            http_bind: file_http_bind,
            latency_scale: file_latency_scale,
            list_stale_secs: file_list_stale_secs,
            stats_stale_secs: file_stats_stale_secs,
            cache_capacity: file_cache_capacity,
            stats_mode: file_stats_mode,
            shutdown_timeout_secs: file_shutdown_timeout_secs,
        } = file_config;

        let defaults = Self::default();

        let latency_scale = cli_latency_scale
            .or(file_latency_scale)
            .unwrap_or(defaults.latency_scale);
        anyhow::ensure!(
            latency_scale.is_finite() && latency_scale >= 0.0,
            "latency scale must be a non-negative number, got {latency_scale}"
        );
        anyhow::ensure!(
            latency_scale <= MAX_LATENCY_SCALE,
            "latency scale must be at most {MAX_LATENCY_SCALE}, got {latency_scale}"
        );

        let cache_capacity = cli_cache_capacity
            .or(file_cache_capacity)
            .unwrap_or(defaults.cache_capacity);
        anyhow::ensure!(cache_capacity > 0, "cache capacity must be at least 1");

        let shutdown_timeout = cli_shutdown_timeout_secs
            .or(file_shutdown_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_timeout);
        anyhow::ensure!(
            !shutdown_timeout.is_zero(),
            "shutdown timeout must be greater than zero"
        );

        Ok(Self {
            http_bind_address: cli_http_bind
                .or(file_http_bind)
                .unwrap_or(defaults.http_bind_address),
            latency_scale,
            list_stale_after: cli_list_stale_secs
                .or(file_list_stale_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.list_stale_after),
            stats_stale_after: cli_stats_stale_secs
                .or(file_stats_stale_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.stats_stale_after),
            cache_capacity,
            stats_mode: cli_stats_mode
                .or(file_stats_mode)
                .unwrap_or(defaults.stats_mode),
            shutdown_timeout,
        })
    }

    pub fn latency_profile(&self) -> LatencyProfile {
        LatencyProfile::default().scaled(self.latency_scale)
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            staleness: StalenessPolicy {
                lists: self.list_stale_after,
                stats: self.stats_stale_after,
                items: Duration::ZERO,
            },
            capacity: self.cache_capacity,
        }
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "admin-dashboard",
    about = "Users and projects admin dashboard",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "ADMIN_DASHBOARD_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "ADMIN_DASHBOARD_LATENCY_SCALE",
        value_name = "FACTOR",
        help = "Multiplier for simulated service latency (0 disables it)"
    )]
    pub latency_scale: Option<f64>,

    #[arg(
        long,
        env = "ADMIN_DASHBOARD_LIST_STALE_SECS",
        value_name = "SECS",
        help = "Seconds a cached user or project list stays fresh"
    )]
    pub list_stale_secs: Option<u64>,

    #[arg(
        long,
        env = "ADMIN_DASHBOARD_STATS_STALE_SECS",
        value_name = "SECS",
        help = "Seconds cached dashboard statistics stay fresh"
    )]
    pub stats_stale_secs: Option<u64>,

    #[arg(
        long,
        env = "ADMIN_DASHBOARD_CACHE_CAPACITY",
        value_name = "N",
        help = "Maximum number of cached query entries",
        value_parser = clap::value_parser!(usize)
    )]
    pub cache_capacity: Option<usize>,

    #[arg(
        long,
        env = "ADMIN_DASHBOARD_STATS_MODE",
        value_enum,
        value_name = "MODE",
        help = "Compute statistics live or serve the fixed snapshot"
    )]
    pub stats_mode: Option<StatsMode>,

    #[arg(
        long,
        env = "ADMIN_DASHBOARD_SHUTDOWN_TIMEOUT_SECS",
        value_name = "SECS",
        help = "Grace period for in-flight requests on shutdown"
    )]
    pub shutdown_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    latency_scale: Option<f64>,
    list_stale_secs: Option<u64>,
    stats_stale_secs: Option<u64>,
    cache_capacity: Option<usize>,
    stats_mode: Option<StatsMode>,
    shutdown_timeout_secs: Option<u64>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
