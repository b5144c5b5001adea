use std::path::PathBuf;

use clap::Parser;
use kube::Client;
use tracing::{info, warn};
use wordpress_stack_operator::logging::{init_logging, LogFormat};
use wordpress_stack_operator::{controller, telemetry, OperatorConfig};

#[derive(Parser, Debug)]
#[command(name = "wordpress-stack-operator", version, about = "Reconciles WordpressInstance records")]
struct Cli {
    /// TOML config file; falls back to WORDPRESS_OPERATOR_CONFIG
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log level: trace|debug|info|warn|error (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,
    #[arg(long, value_enum, default_value_t = LogFormat::Auto)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;
    let config = OperatorConfig::load(cli.config.as_deref())?;
    let client = Client::try_default().await?;
    info!(version = env!("CARGO_PKG_VERSION"), "operator.start");

    let metrics_addr = config.metrics_addr;
    tokio::spawn(async move {
        if let Err(e) = telemetry::serve(metrics_addr).await {
            warn!(error = %e, "metrics.server.failed");
        }
    });
    controller::run(client, config).await
}
