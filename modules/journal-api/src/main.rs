use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use journal_analysis::{AnalysisExecutor, AnalysisPipeline, AnalysisSettings};
use journal_api::{build_router, AppState};
use journal_common::Config;
use journal_models::{HubModelLoader, ModelRegistry, ModelSources};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    info!(
        workers = config.worker_threads,
        keyword_limit = config.keyword_limit,
        entities = config.enable_entities,
        sarcasm_model = %config.sarcasm_model,
        emotion_model = %config.emotion_model,
        ner_model = %config.ner_model,
        "Starting journal-api"
    );

    let loader = Arc::new(HubModelLoader::new(ModelSources::from(&config)));
    let registry = Arc::new(
        ModelRegistry::new(loader).with_serialized_inference(config.serialize_inference),
    );

    if config.preload_models {
        let registry = registry.clone();
        let failures = tokio::task::spawn_blocking(move || registry.preload()).await?;
        for e in &failures {
            warn!(kind = %e.kind(), error = %e, "Model preload failed, will retry on first use");
        }
    }

    let pipeline = Arc::new(AnalysisPipeline::new(
        registry,
        AnalysisSettings::from(&config),
    ));
    let executor = Arc::new(AnalysisExecutor::new(pipeline, config.worker_threads)?);

    let app = build_router(
        AppState::new(executor.clone(), config.analysis_timeout),
        &config.allowed_origins,
    );

    let addr = config.bind_addr();
    info!("Journal API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight analyses finish before exiting.
    tokio::task::spawn_blocking(move || executor.shutdown()).await?;
    Ok(())
}

/// `LOG_FORMAT=json` for structured output, human-readable otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
