//! End-to-end pipeline tests against fake tools.
//!
//! Every test writes executable scripts and then spawns them, so they run
//! serially to keep forked children from holding the scripts open for write.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{FakeEngine, FakeFfmpeg, Fakes, TestHarness, Upload, UPLOAD_LINK};
use serial_test::serial;
use talkforge::pipeline::{JobResponse, RenderInput};
use talkforge::state::{JobResult, JobState};
use talkforge_common::{QualityTier, Stage};
use tokio_util::sync::CancellationToken;

fn failed(result: &JobResult) -> (Stage, &str, &str) {
    match result {
        JobResult::Failed {
            stage,
            kind,
            message,
        } => (*stage, kind.as_str(), message.as_str()),
        other => panic!("expected failure, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test]
#[serial]
async fn standard_render_publishes_and_cleans_up() {
    let h = TestHarness::new().await;

    let (id, result) = h.render(None).await;

    assert_eq!(result.video_url(), Some(UPLOAD_LINK));
    assert!(h.leftover_workspaces().is_empty());

    let job = h.ctx.state.get_job(&id).unwrap();
    assert_eq!(job.state, JobState::Done);
    assert!(job.completed_at.is_some());
    assert!(job.workspace.is_some());

    let response = JobResponse::from_result(&id, &result);
    assert_eq!(response.status, "done");
    assert_eq!(response.error, None);
}

#[tokio::test]
#[serial]
async fn stages_run_in_order_with_normalized_audio() {
    let h = TestHarness::new().await;

    let (_, result) = h.render(Some("standard")).await;
    assert!(result.is_done());

    let ffmpeg = h.ffmpeg_calls();
    assert_eq!(ffmpeg.len(), 1, "only the normalize pass runs: {ffmpeg:?}");
    assert!(ffmpeg[0].contains("-ar 16000 -ac 1"));
    assert!(ffmpeg[0].contains("input_audio"));
    assert!(ffmpeg[0].ends_with("input.wav"));

    let engine = h.engine_calls();
    assert_eq!(engine.len(), 1);
    assert!(engine[0].contains("--size infinitetalk-720"));
    assert!(engine[0].contains("--input_json"));
}

#[tokio::test]
#[serial]
async fn low_tier_uses_small_preset_without_enhancer() {
    let h = TestHarness::with(Fakes {
        upload: Upload::Local,
        ..Fakes::default()
    })
    .await;

    let (_, result) = h.render(Some("480p")).await;
    let url = result.video_url().expect("render succeeds").to_string();

    assert!(h.engine_calls()[0].contains("--size infinitetalk-480"));
    assert_eq!(h.ffmpeg_calls().len(), 1);

    let name = url.rsplit('/').next().unwrap();
    let published = std::fs::read_to_string(h.published_dir().join(name)).unwrap();
    assert_eq!(published, "video infinitetalk-480");
}

#[tokio::test]
#[serial]
async fn high_tier_upscales_before_publishing() {
    let h = TestHarness::with(Fakes {
        upload: Upload::Local,
        ..Fakes::default()
    })
    .await;

    let (id, result) = h.render(Some("high")).await;
    assert!(result.is_done(), "{result:?}");

    let ffmpeg = h.ffmpeg_calls();
    assert_eq!(ffmpeg.len(), 2);
    assert!(ffmpeg[1].contains("scale=1920:1080"));
    assert!(ffmpeg[1].ends_with("upscaled.mp4"));
    assert!(h.engine_calls()[0].contains("--size infinitetalk-720"));

    assert_eq!(h.ctx.state.get_job(&id).unwrap().tier, QualityTier::High);
    assert!(h.leftover_workspaces().is_empty());
}

#[tokio::test]
#[serial]
async fn locator_falls_back_to_any_video() {
    let h = TestHarness::with(Fakes {
        engine: FakeEngine::OddName,
        ..Fakes::default()
    })
    .await;

    let (_, result) = h.render(None).await;
    assert_eq!(result.video_url(), Some(UPLOAD_LINK));
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
#[serial]
async fn unreachable_input_fails_in_fetch() {
    let h = TestHarness::new().await;
    let input = RenderInput {
        image_url: format!("{}/missing.png", h.server.uri()),
        ..h.input(None)
    };

    let (_, result) = h.render_input(&input).await;

    let (stage, kind, message) = failed(&result);
    assert_eq!(stage, Stage::Fetch);
    assert_eq!(kind, "TransportError");
    assert!(message.starts_with("fetch: "));
    assert!(message.contains("404"));
    assert!(h.engine_calls().is_empty());
    assert!(h.leftover_workspaces().is_empty());
}

#[tokio::test]
#[serial]
async fn normalize_failure_stops_before_synthesis() {
    let h = TestHarness::with(Fakes {
        ffmpeg: FakeFfmpeg::Fail,
        ..Fakes::default()
    })
    .await;

    let (id, result) = h.render(None).await;

    let (stage, kind, message) = failed(&result);
    assert_eq!(stage, Stage::Normalize);
    assert_eq!(kind, "TranscodeError");
    assert!(message.starts_with("normalize: "));
    assert!(message.contains("Invalid data found"));
    assert!(h.engine_calls().is_empty(), "engine must not run");
    assert!(h.leftover_workspaces().is_empty());

    let job = h.ctx.state.get_job(&id).unwrap();
    assert_matches!(job.state, JobState::Failed { stage: Stage::Normalize, .. });
}

#[tokio::test]
#[serial]
async fn engine_failure_carries_stderr_tail() {
    let h = TestHarness::with(Fakes {
        engine: FakeEngine::Fail,
        ..Fakes::default()
    })
    .await;

    let (_, result) = h.render(None).await;

    let (stage, kind, message) = failed(&result);
    assert_eq!(stage, Stage::Synthesize);
    assert_eq!(kind, "SynthesisError");
    assert!(message.starts_with("synthesize: "));
    assert!(message.contains("CUDA out of memory"));
    assert!(h.leftover_workspaces().is_empty());
}

#[tokio::test]
#[serial]
async fn engine_without_output_fails_in_locate() {
    let h = TestHarness::with(Fakes {
        engine: FakeEngine::NoOutput,
        ..Fakes::default()
    })
    .await;

    let (_, result) = h.render(None).await;

    let (stage, kind, message) = failed(&result);
    assert_eq!(stage, Stage::Locate);
    assert_eq!(kind, "ArtifactNotFoundError");
    assert!(message.starts_with("locate: "));
}

#[tokio::test]
#[serial]
async fn enhancer_failure_is_terminal() {
    let h = TestHarness::with(Fakes {
        ffmpeg: FakeFfmpeg::FailUpscale,
        upload: Upload::Local,
        ..Fakes::default()
    })
    .await;

    let (id, result) = h.render(Some("high")).await;

    let (stage, kind, message) = failed(&result);
    assert_eq!(stage, Stage::Enhance);
    assert_eq!(kind, "EnhanceError");
    assert!(message.starts_with("enhance: "));
    assert!(message.contains("Error while filtering"));
    assert_eq!(result.video_url(), None);

    assert_eq!(h.ffmpeg_calls().len(), 2);
    assert_eq!(h.engine_calls().len(), 1);
    let published: Vec<_> = std::fs::read_dir(h.published_dir()).unwrap().collect();
    assert!(published.is_empty(), "unenhanced video must not be published");
    assert!(h.leftover_workspaces().is_empty());

    let job = h.ctx.state.get_job(&id).unwrap();
    assert_matches!(job.state, JobState::Failed { stage: Stage::Enhance, .. });
}

#[tokio::test]
#[serial]
async fn upload_without_link_is_a_parse_error() {
    let h = TestHarness::with(Fakes {
        upload: Upload::MissingLink,
        ..Fakes::default()
    })
    .await;

    let (_, result) = h.render(None).await;

    let (stage, kind, message) = failed(&result);
    assert_eq!(stage, Stage::Publish);
    assert_eq!(kind, "ResponseParseError");
    assert!(message.starts_with("publish: "));
    assert!(h.leftover_workspaces().is_empty());
}

// ---------------------------------------------------------------------------
// Concurrency and cancellation
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_jobs_are_isolated() {
    let h = TestHarness::with(Fakes {
        upload: Upload::Local,
        synthesis_slots: Some(1),
        ..Fakes::default()
    })
    .await;

    let low = h.input(Some("low"));
    let standard = h.input(Some("standard"));
    let ((a, ra), (b, rb)) = tokio::join!(h.render_input(&low), h.render_input(&standard));

    let url_a = ra.video_url().expect("first job succeeds");
    let url_b = rb.video_url().expect("second job succeeds");
    assert_ne!(url_a, url_b);

    let job_a = h.ctx.state.get_job(&a).unwrap();
    let job_b = h.ctx.state.get_job(&b).unwrap();
    assert_ne!(job_a.workspace, job_b.workspace);

    let contents: Vec<String> = [url_a, url_b]
        .iter()
        .map(|url| {
            let name = url.rsplit('/').next().unwrap();
            std::fs::read_to_string(h.published_dir().join(name)).unwrap()
        })
        .collect();
    assert_eq!(contents[0], "video infinitetalk-480");
    assert_eq!(contents[1], "video infinitetalk-720");

    assert_eq!(h.engine_calls().len(), 2);
    assert_eq!(h.ctx.orchestrator.invoker().available_slots(), 1);
    assert!(h.leftover_workspaces().is_empty());
    assert_eq!(h.ctx.state.get_stats().successful, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn cancellation_kills_engine_and_releases_workspace() {
    let h = TestHarness::with(Fakes {
        engine: FakeEngine::Hang,
        ..Fakes::default()
    })
    .await;

    let input = h.input(None);
    let job_id = h.ctx.state.create_job(input.tier).id;
    let token = CancellationToken::new();

    let orchestrator = h.ctx.orchestrator.clone();
    let run_token = token.clone();
    let task = tokio::spawn(async move { orchestrator.run(job_id, &input, run_token).await });

    let mut pid = None;
    for _ in 0..100 {
        pid = h.engine_pid();
        if pid.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let pid = pid.expect("engine started");
    assert_eq!(
        h.ctx.state.get_job(&job_id).unwrap().state,
        JobState::Synthesizing
    );

    token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("job stops promptly after cancel")
        .unwrap();

    let (stage, kind, _) = failed(&result);
    assert_eq!(stage, Stage::Synthesize);
    assert_eq!(kind, "Cancelled");
    assert!(
        !std::path::Path::new(&format!("/proc/{pid}")).exists(),
        "engine process {pid} still alive"
    );
    assert!(h.leftover_workspaces().is_empty());
    assert_eq!(h.ctx.state.get_stats().cancelled, 1);
    assert!(h.ctx.state.get_active_jobs().is_empty());
}

#[tokio::test]
#[serial]
async fn cancelled_before_start_runs_nothing() {
    let h = TestHarness::new().await;
    let input = h.input(None);
    let job = h.ctx.state.create_job(input.tier);
    let token = CancellationToken::new();
    token.cancel();

    let result = h.ctx.orchestrator.run(job.id, &input, token).await;

    let (stage, kind, _) = failed(&result);
    assert_eq!(stage, Stage::Fetch);
    assert_eq!(kind, "Cancelled");
    assert!(h.ffmpeg_calls().is_empty());
    assert!(h.engine_calls().is_empty());
    assert!(h.leftover_workspaces().is_empty());
}
