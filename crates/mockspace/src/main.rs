use anyhow::Context;
use clap::Parser;
use mockspace::admin_api::AdminApiServer;
use mockspace::config::{ServerConfig, UrlComparison};
use mockspace::namespace::NamespaceRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Namespaced HTTP mocking service
#[derive(Parser, Debug)]
#[command(name = "mockspace")]
#[command(author, version, about)]
struct Args {
    /// YAML configuration file; flags override its values
    #[arg(short, long, env = "MOCKSPACE_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long, env = "MOCKSPACE_HOST")]
    host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "MOCKSPACE_PORT")]
    port: Option<u16>,

    /// First path segment reserved for control operations
    #[arg(long, env = "MOCKSPACE_CONTROL_PREFIX")]
    control_prefix: Option<String>,

    /// How exact rule URLs are compared: path or pathAndQuery
    #[arg(long, env = "MOCKSPACE_URL_COMPARISON")]
    url_comparison: Option<UrlComparison>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "MOCKSPACE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format: text or json
    #[arg(long, env = "MOCKSPACE_LOG_FORMAT", default_value = "text")]
    log_format: String,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            config.listen.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(prefix) = &self.control_prefix {
            config.control_prefix = prefix.clone();
        }
        if let Some(comparison) = self.url_comparison {
            config.url_comparison = comparison;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    init_tracing(&args.log_level, &args.log_format);

    let config = args.server_config()?;
    let registry = Arc::new(NamespaceRegistry::new(config.url_comparison));

    let server = AdminApiServer::bind(
        config.socket_addr()?,
        &config.control_prefix,
        Arc::clone(&registry),
    )
    .await
    .with_context(|| format!("Failed to bind {}:{}", config.listen.host, config.listen.port))?;

    server.run_until(shutdown_signal()).await?;

    let dropped = registry.clear();
    info!(dropped, "Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
