mod breaking;
mod core;
mod decode;
mod fetch;
mod gate;
mod gemini;
mod http;
mod keys;
mod orchestrator;
mod scheduler;
mod session;
mod sources;
mod timers;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use ticker_proto::config::Config;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::gemini::GeminiClient;
use crate::keys::KeyRotationPool;
use crate::sources::{build_client, ReqwestHttp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // File logging
    let log_path = ticker_proto::platform::log_path();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,ticker_daemon=debug,hyper_util=warn,reqwest=warn",
                )
            }),
        )
        .init();

    eprintln!("ticker-daemon logging to {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    // Missing keys are not fatal to the process: the core surfaces them as a
    // configuration error in the snapshot.
    let keys = config.credentials().unwrap_or_else(|e| {
        warn!("{}", e);
        Vec::new()
    });
    let keys = Arc::new(KeyRotationPool::seeded(keys));

    let client = build_client(config.schedule.fetch_timeout());
    let ai = GeminiClient::new(
        client.clone(),
        config.ai.base_url.clone(),
        config.ai.model.clone(),
        keys.clone(),
    );

    // Event channel: all external inputs funnel into TickerCore
    let (event_tx, event_rx) = tokio::sync::mpsc::channel::<core::CoreEvent>(256);

    let ticker_core = core::TickerCore::new(
        config.clone(),
        core::Sources {
            ai: Arc::new(ai),
            http: Arc::new(ReqwestHttp::new(client)),
            keys,
        },
        event_tx.clone(),
    );
    let state_manager = ticker_core.state_manager();

    if config.http.enabled {
        let _http_handle = http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            state_manager.clone(),
            event_tx.clone(),
        );
    }

    let shutdown_tx = event_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(core::CoreEvent::Shutdown).await;
        }
    });

    info!("Ticker initialised, running event loop");
    ticker_core.run(event_rx).await?;

    Ok(())
}
