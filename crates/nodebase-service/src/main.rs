//! Nodebase daemon entry point.

use clap::Parser;
use nodebase_service::config::Profile;
use nodebase_service::{ServiceConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Nodebase daemon CLI
#[derive(Parser)]
#[command(name = "nodebased")]
#[command(about = "Nodebase - workflow automation backend", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NODEBASE_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "NODEBASE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Deployment profile
    #[arg(short, long, env = "NODEBASE_PROFILE")]
    profile: Option<String>,

    /// Log level
    #[arg(long, env = "NODEBASE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "NODEBASE_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = ServiceConfig::load(cli.config.as_deref())?;

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address: {}", e))?;
    }

    if let Some(profile) = cli.profile {
        config.profile = match profile.to_lowercase().as_str() {
            "development" | "dev" => Profile::Development,
            "production" | "prod" => Profile::Production,
            other => anyhow::bail!("unknown profile: {}", other),
        };
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        profile = ?config.profile,
        "starting nodebase daemon"
    );

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
