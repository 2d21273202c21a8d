use anyhow::{Context, Result};
use livepoll::{
    load_config, EngineConfig, EngineEvent, EventKind, LiveUpdateEngine, MatchProvider,
    VisibilitySignal,
};
use livepoll_runner::{HttpMatchProvider, RunnerSettings};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livepoll=info,livepoll_runner=info".into()),
        )
        .init();

    info!("Live update runner starting...");

    let settings = RunnerSettings::from_env()?;

    let config = match &settings.config_path {
        Some(path) => {
            let mut config = load_config(path)?;
            config.apply_env();
            config
        }
        None => EngineConfig::from_env(),
    };

    info!(
        provider_url = %settings.provider_url,
        api_key = settings.api_key.is_some(),
        backgrounded = settings.backgrounded,
        failure_threshold = config.health.failure_threshold,
        cooldown_secs = config.health.cooldown_secs,
        fetch_timeout_ms = config.fetch.timeout_ms,
        "Configuration loaded"
    );

    let provider: Arc<dyn MatchProvider> = Arc::new(
        HttpMatchProvider::new(settings.provider_url.clone(), settings.api_key.clone())
            .context("Failed to initialize HTTP provider")?,
    );

    let visibility = VisibilitySignal::with_state(settings.backgrounded);
    let engine = LiveUpdateEngine::new(provider, config).with_visibility(visibility);

    if engine.check_status().await.connected {
        info!("Live feed reachable");
    } else {
        warn!("Live feed unreachable at startup, polling anyway");
    }

    engine.subscribe(EventKind::Connectivity, |event| {
        if let EngineEvent::Connectivity(status) = event {
            if status.connected {
                info!("Live feed connected");
            } else {
                warn!("Live feed disconnected, waiting for cooldown");
            }
        }
        Ok(())
    });

    engine.subscribe(EventKind::MatchUpdate, |event| {
        let line = serde_json::to_string(event).context("Failed to serialize update")?;
        info!(event = %line, "Match update");
        Ok(())
    });
    info!("Polling started");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    engine.shutdown();
    info!(stats = ?engine.health_stats(), "Live update runner stopped");

    Ok(())
}
