use crate::config::{Config, PublishBackend};
use crate::pipeline::JobOrchestrator;
use crate::publish::{create_publisher, Publisher, VIDEOS_ROUTE};
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod routes_api;
pub mod routes_render;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<AppState>,
    pub config: Arc<Config>,
    pub orchestrator: Arc<JobOrchestrator>,
    /// Cancelled on shutdown; every job runs under a child of this token
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Wire the registry, publisher and orchestrator for `config`.
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let state = AppState::new(config.history.max_entries);
        let publisher: Arc<dyn Publisher> = Arc::from(create_publisher(
            &config.publish,
            config.limits.diagnostic_tail_bytes,
        )?);
        let orchestrator = Arc::new(JobOrchestrator::new(
            config.clone(),
            publisher,
            state.clone(),
        ));

        Ok(Self {
            state,
            config,
            orchestrator,
            shutdown: CancellationToken::new(),
        })
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let videos_dir = local_videos_dir(&ctx.config);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .merge(routes_render::render_routes())
        .nest("/api", routes_api::api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    if let Some(dir) = videos_dir {
        tracing::info!("Serving published videos from {:?} at {}", dir, VIDEOS_ROUTE);
        app = app.nest_service(VIDEOS_ROUTE, ServeDir::new(dir));
    }

    app
}

fn local_videos_dir(config: &Config) -> Option<PathBuf> {
    match config.publish.backend {
        PublishBackend::Local => config.publish.local_dir.clone(),
        PublishBackend::FileHost => None,
    }
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config)?;
    let shutdown = ctx.shutdown.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Running jobs are killed, not drained.
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
