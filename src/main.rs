use admin_dashboard::{CliArgs, LoggingConfig, ServerConfig, init_logging, run_server};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    // Validation happens here so a bad config fails before binding.
    let config = ServerConfig::from_args(cli)?;

    run_server(config).await
}
