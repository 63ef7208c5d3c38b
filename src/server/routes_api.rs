use crate::server::AppContext;
use crate::state::Job;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use talkforge_av::check_tools;
use talkforge_common::{JobId, QualityTier};

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
        .route("/history", get(get_history))
        .route("/tools", get(get_tools))
        .route("/tiers", get(get_tiers))
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let stats = ctx.state.get_stats();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "stats": {
            "total_processed": stats.total_processed,
            "success_rate": stats.success_rate()
        }
    }))
}

async fn stats(State(ctx): State<AppContext>) -> impl IntoResponse {
    let stats = ctx.state.get_stats();
    Json(serde_json::json!({
        "jobs": stats,
        "active": ctx.state.get_active_jobs().len(),
        "synthesis_slots": {
            "total": ctx.config.limits.max_concurrent_synthesis,
            "available": ctx.orchestrator.invoker().available_slots(),
        },
        "publisher": ctx.orchestrator.publisher_name(),
    }))
}

#[derive(Deserialize)]
struct ListJobsQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_jobs(
    State(ctx): State<AppContext>,
    Query(params): Query<ListJobsQuery>,
) -> impl IntoResponse {
    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);
    let jobs: Vec<_> = ctx
        .state
        .get_active_jobs()
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();

    Json(jobs)
}

async fn get_job(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Job>, StatusCode> {
    let id = JobId::from_str(&id).map_err(|_| StatusCode::NOT_FOUND)?;
    ctx.state.get_job(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn get_history(
    State(ctx): State<AppContext>,
    Query(params): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(50);
    Json(ctx.state.get_history(limit))
}

async fn get_tools(State(ctx): State<AppContext>) -> impl IntoResponse {
    let ffmpeg = ctx
        .config
        .tools
        .ffmpeg_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("ffmpeg"));
    let tools = check_tools(&ffmpeg, &ctx.config.engine.program);

    let tools: Vec<_> = tools
        .into_iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "available": t.available,
                "version": t.version,
                "path": t.path.map(|p| p.display().to_string()),
            })
        })
        .collect();

    Json(tools)
}

async fn get_tiers() -> impl IntoResponse {
    let tiers: Vec<_> = QualityTier::ALL
        .iter()
        .map(|tier| {
            let preset = tier.preset();
            serde_json::json!({
                "tier": tier,
                "engine_size": preset.engine_size,
                "upscale": preset.upscale.map(|r| r.to_string()),
            })
        })
        .collect();

    Json(tiers)
}
