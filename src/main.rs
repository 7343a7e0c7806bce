use anyhow::Context;
use clap::Parser;
use coin_identifier::utils::{logger, validation::Validate};
use coin_identifier::{build_router, server, AppState, CliConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, cli.json_logs);

    tracing::info!("Starting coin-identifier");

    // 載入並驗證配置
    let config = cli
        .into_service_config()
        .context("failed to load configuration")?;
    if cli.verbose {
        tracing::debug!("Service config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let state = AppState::from_config(&config).context("failed to initialise services")?;
    let router = build_router(state, &config);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    server::serve(listener, router, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
