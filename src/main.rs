use clap::Parser;
use glm_proxy::config::config_search_paths;
use glm_proxy::{build_router, AppState, ProxyConfig, Relay, SharedLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "glm-proxy",
    about = "OpenAI-compatible chat completions proxy for the GLM API",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Default model when the caller names none (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Log file path
    #[arg(long, default_value = "glm-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glm_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(base_url) = cli.base_url {
        config.upstream.base_url = base_url;
    }
    if let Some(model) = cli.model {
        config.upstream.default_model = model;
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    // Created once; every request shares its connection pool.
    let relay = Relay::from_config(&config)?;
    let bind_addr = config.bind_addr();

    info!("glm-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:  {}", relay.url());
    info!("  Model:     {}", config.upstream.default_model);
    info!("  Key env:   {}", config.upstream.api_key_env);
    info!("  Timeout:   {}s", config.upstream.timeout_secs);
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting glm-proxy upstream={} model={} bind={}",
            config.upstream.base_url, config.upstream.default_model, bind_addr
        ),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        relay,
        logger: logger.clone(),
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("");
    info!("  Point OpenAI-compatible clients at:");
    info!("    base URL: http://{}/v1", bind_addr);
    info!("    model:    {}", config.upstream.default_model);
    info!("");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logger.info("shutdown", "Proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down proxy server...");
}
