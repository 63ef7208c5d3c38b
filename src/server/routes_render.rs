use crate::pipeline::{JobResponse, RenderRequest};
use crate::server::AppContext;
use crate::state::JobResult;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::str::FromStr;
use talkforge_common::{JobId, Stage};

pub fn render_routes() -> Router<AppContext> {
    Router::new()
        .route("/render", post(render))
        .route("/status/:job_id", get(status))
}

/// Run a render to completion and answer with its result.
///
/// The job runs on its own task. If the client disconnects, the handler
/// future is dropped, the drop guard cancels the job, and the task kills the
/// engine and releases the workspace.
async fn render(
    State(ctx): State<AppContext>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> (StatusCode, Json<JobResponse>) {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!("Rejected render request: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(JobResponse::error(
                    &JobId::new(),
                    format!("request: {}", rejection.body_text()),
                )),
            );
        }
    };

    let input = match request.validate() {
        Ok(input) => input,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(JobResponse::error(&JobId::new(), format!("request: {e}"))),
            );
        }
    };

    let job = ctx.state.create_job(input.tier);
    let job_id = job.id;
    let token = ctx.shutdown.child_token();
    let guard = token.clone().drop_guard();

    let orchestrator = ctx.orchestrator.clone();
    let handle = tokio::spawn(async move { orchestrator.run(job_id, &input, token).await });
    let joined = handle.await;
    guard.disarm();

    match joined {
        Ok(result) => (StatusCode::OK, Json(JobResponse::from_result(&job_id, &result))),
        Err(e) => {
            tracing::error!("Render task for job {} aborted: {}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JobResponse::error(&job_id, format!("internal: {e}"))),
            )
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn status(
    State(ctx): State<AppContext>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let id = JobId::from_str(&job_id).map_err(|_| StatusCode::NOT_FOUND)?;
    let job = ctx.state.get_job(&id).ok_or(StatusCode::NOT_FOUND)?;

    let (stage, video_url, error) = match &job.result {
        Some(JobResult::Done { video_url }) => (None, Some(video_url.clone()), None),
        Some(JobResult::Failed { stage, message, .. }) => {
            (Some(*stage), None, Some(message.clone()))
        }
        None => (None, None, None),
    };

    Ok(Json(StatusResponse {
        job_id: job.id.to_string(),
        status: job.state.status_label(),
        stage,
        video_url,
        error,
    }))
}
