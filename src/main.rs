//! # Voice Screen Backend - Main Application Entry Point
//!
//! HTTP service that screens sustained-vowel recordings for laryngeal cancer
//! risk and hands results off to a conversational agent by session id.
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: Request handling, child processes and the cache are all asynchronous
//! - **Trait objects**: The cache backend and pipeline stages are chosen at startup
//!   and used through traits (`ResultCache`, `AudioNormalizer`, `FeatureExtractor`)
//! - **Result<T, E>**: `anyhow` at startup, typed errors everywhere else
//! - **static**: A global shutdown flag shared by the signal handler and the server loop
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, config.toml, environment)
//! - **features**: The acoustic feature vector and its invariants
//! - **classifier**: Rule-based and hybrid risk classification
//! - **cache**: Session-keyed result cache (Redis or process-local)
//! - **handoff**: Cache write plus best-effort agent notification
//! - **audio**: Upload scratch files, ffmpeg conversion, PCM checks, feature extraction
//! - **screening**: The pipeline tying the above together
//! - **state / health / middleware / handlers / error**: The HTTP surface

mod audio;
mod cache;
mod classifier;
mod config;
mod error;
mod features;
mod handlers;
mod handoff;
mod health;
mod middleware;
mod screening;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use cache::{build_cache, ResultCache, SystemClock};
use config::AppConfig;
use screening::ScreeningService;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown signal, set once by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Sets up logging** for debugging and monitoring
/// 3. **Builds the long-lived components** once: cache backend, classifier, pipeline
/// 4. **Configures the HTTP server** with middleware and routes
/// 5. **Handles graceful shutdown** when receiving system signals
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load().context("loading configuration")?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let cache = build_cache(&config.cache, Arc::new(SystemClock)).await;
    if cache.backend_name() == "memory" {
        spawn_cache_sweeper(cache.clone(), Duration::from_secs(config.cache.sweep_interval_secs));
    }

    let screening = ScreeningService::from_config(&config, cache.clone()).await?;
    info!(
        method = screening.classifier().method().as_str(),
        model = screening.classifier().model_description().unwrap_or("none"),
        locale = config.analysis.locale.as_str(),
        "Classifier ready"
    );

    let app_state = AppState::new(config.clone(), cache, screening);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .wrap(TracingLogger::default())
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/info", web::get().to(handlers::get_info))
                    .route("/analyze", web::post().to(handlers::analyze))
                    .route("/analyze/{session_id}", web::post().to(handlers::analyze_session))
                    .route("/results/{session_id}", web::get().to(handlers::get_result))
                    .route("/results/{session_id}", web::delete().to(handlers::delete_result)),
            )
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)
    .with_context(|| format!("binding {}", bind_addr))?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "info", "voice_screen_backend=trace")
/// - If not set, defaults to "voice_screen_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_screen_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

/// Periodically drop expired entries from the process-local cache.
///
/// Reads already ignore expired entries; this only bounds memory use for
/// sessions nobody comes back for.
fn spawn_cache_sweeper(cache: Arc<dyn ResultCache>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick completes immediately
        ticker.tick().await;

        while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
            ticker.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                debug!(purged, backend = cache.backend_name(), "Expired results swept");
            }
        }
    });
}

/// Set up signal handlers for graceful shutdown.
///
/// Listens for SIGTERM and SIGINT and sets the global shutdown flag when
/// either arrives. If the handlers cannot be installed the server still runs;
/// it just cannot be stopped gracefully by signal.
fn setup_signal_handlers() {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async {
        let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set, polling every 100ms.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
