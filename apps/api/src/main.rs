mod assessment;
mod config;
mod delivery;
mod errors;
mod report;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assessment::plan::FreeTierGate;
use crate::assessment::questionnaire::{standard_layout, Questionnaire};
use crate::assessment::scoring::ScoringOptions;
use crate::config::Config;
use crate::delivery::{DeliveryOrchestrator, MailDispatcher, OrchestratorConfig};
use crate::report::{ConverterConfig, HtmlReportRenderer, ProcessConverter};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load and validate configuration first; start-up fails on a bad timeout budget
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Assessment API v{}", env!("CARGO_PKG_VERSION"));

    // PDF converter: isolated child process, hard timeout
    let converter = ProcessConverter::new(ConverterConfig::wkhtmltopdf(
        &config.pdf_renderer_bin,
        config.pdf_timeout,
        config.pdf_kill_grace,
        config.pdf_min_bytes,
    ));
    info!(
        "PDF converter: {} (timeout {}s, grace {}s)",
        config.pdf_renderer_bin,
        config.pdf_timeout.as_secs(),
        config.pdf_kill_grace.as_secs()
    );

    // Mail dispatcher (demo mode without credentials)
    let dispatcher = MailDispatcher::from_settings(config.mail.as_ref(), config.pdf_min_bytes)?;
    if !dispatcher.is_demo() {
        info!("Mail dispatcher initialized");
    }

    let orchestrator = Arc::new(DeliveryOrchestrator::start(
        OrchestratorConfig {
            workers: config.delivery_workers,
            queue_capacity: config.delivery_queue_capacity,
            reports_dir: config.reports_dir.clone(),
        },
        Arc::new(converter),
        Arc::new(dispatcher),
    ));

    let questionnaire = Questionnaire::new(standard_layout())?;
    info!(
        "Questionnaire: {} categories, {} questions",
        questionnaire.categories().len(),
        questionnaire.total_questions()
    );

    let state = AppState {
        config: config.clone(),
        questionnaire: Arc::new(questionnaire),
        scoring: ScoringOptions::default(),
        // No payment provider yet: every submission is free tier.
        premium_gate: Arc::new(FreeTierGate),
        renderer: Arc::new(HtmlReportRenderer::default()),
        orchestrator: orchestrator.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the survey front-end origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Accepted jobs still get delivered after the listener closes
    orchestrator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
