//! HTTP API tests driving the full router in-process.
//!
//! Every test builds a fresh registry so gauge state never leaks between
//! tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use prometheus_client::registry::Registry;
use serde_json::{Value, json};
use tower::ServiceExt;

use znapzend_exporter::server::{AppState, router};
use znapzend_exporter_core::StageService;
use znapzend_exporter_core::config::ExporterSettings;
use znapzend_exporter_core::lifecycle::{LifecycleConfig, LifecycleManager};

fn app_with(settings: ExporterSettings) -> Router {
    let lifecycle = Arc::new(LifecycleManager::new(LifecycleConfig::default()));
    let mut registry = Registry::default();
    let service = StageService::new(&mut registry, &settings);
    lifecycle.mark_registry_initialized();
    service.register_startup_jobs(&settings.startup_jobs);
    lifecycle.mark_startup_jobs_registered();
    lifecycle.mark_ready();

    router(AppState {
        service,
        lifecycle,
        registry: Arc::new(registry),
    })
}

fn app() -> Router {
    app_with(ExporterSettings::default())
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri).await
}

async fn scrape(app: &Router) -> String {
    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

fn presnap(job: &str, value: u8) -> String {
    format!("znapzend_presnap_command_started{{job=\"{job}\"}} {value}")
}

fn postsnap(job: &str, value: u8) -> String {
    format!("znapzend_postsnap_command_finished{{job=\"{job}\"}} {value}")
}

fn presend(job: &str, host: &str, value: u8) -> String {
    format!("znapzend_presend_command_started{{job=\"{job}\",target_host=\"{host}\"}} {value}")
}

fn postsend(job: &str, host: &str, value: u8) -> String {
    format!("znapzend_postsend_command_finished{{job=\"{job}\",target_host=\"{host}\"}} {value}")
}

// ============================================================================
// Stage reports
// ============================================================================

#[tokio::test]
async fn test_presnap_then_postsnap() {
    let app = app();

    let (status, body) = get(&app, "/presnap/tank").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["job"], "tank");
    assert_eq!(body["stage"], "presnap");
    assert!(scrape(&app).await.contains(&presnap("tank", 1)));

    let (status, body) = get(&app, "/postsnap/tank?ResetPreSnap=true").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["reset"]
            .as_array()
            .unwrap()
            .contains(&json!("presnap"))
    );

    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presnap("tank", 0)));
    assert!(metrics.contains(&postsnap("tank", 1)));
}

#[tokio::test]
async fn test_resets_default_to_true() {
    let app = app();

    get(&app, "/postsnap/tank").await;
    let (status, body) = get(&app, "/presnap/tank").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reset"], json!(["postsnap", "presend", "postsend"]));
    let metrics = scrape(&app).await;
    assert!(metrics.contains(&postsnap("tank", 0)));
    assert!(metrics.contains(&presnap("tank", 1)));
}

#[tokio::test]
async fn test_reset_opt_out_keeps_other_stage() {
    let app = app();

    get(&app, "/presnap/tank").await;
    let (_, body) = get(
        &app,
        "/postsnap/tank?ResetPreSnap=false&ResetPreSend=f&ResetPostSend=0",
    )
    .await;

    assert_eq!(body["reset"], json!([]));
    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presnap("tank", 1)));
    assert!(metrics.contains(&postsnap("tank", 1)));
}

#[tokio::test]
async fn test_post_is_accepted() {
    let app = app();

    let (status, body) = send(&app, "POST", "/presnap/tank").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "presnap");
}

#[tokio::test]
async fn test_nested_job_name() {
    let app = app();

    let (status, body) = get(&app, "/presnap/tank/backup/daily").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"], "tank/backup/daily");
    assert!(scrape(&app).await.contains(&presnap("tank/backup/daily", 1)));
}

#[tokio::test]
async fn test_presend_requires_target_host() {
    let app = app();

    let (status, body) = get(&app, "/presend/tank").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("missing TargetHost parameter")
    );
    assert!(!scrape(&app).await.contains("job=\"tank\""));
}

#[tokio::test]
async fn test_send_stages_per_host() {
    let app = app();

    let (status, body) = get(&app, "/presend/tank?TargetHost=hostA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target_host"], "hostA");
    get(&app, "/presend/tank?TargetHost=hostB").await;
    get(&app, "/postsend/tank?TargetHost=hostA").await;

    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presend("tank", "hostA", 0)));
    assert!(metrics.contains(&postsend("tank", "hostA", 1)));
    assert!(metrics.contains(&presend("tank", "hostB", 1)));
}

#[tokio::test]
async fn test_target_host_ignored_when_not_host_aware() {
    let app = app_with(ExporterSettings {
        host_aware: false,
        ..ExporterSettings::default()
    });

    let (status, body) = get(&app, "/presend/tank?TargetHost=hostA").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("target_host").is_none());

    let (status, _) = get(&app, "/postsend/tank").await;
    assert_eq!(status, StatusCode::OK);

    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presend("tank", "", 0)));
    assert!(metrics.contains(&postsend("tank", "", 1)));
}

#[tokio::test]
async fn test_invalid_flag_rejected_without_mutation() {
    let app = app();
    get(&app, "/presnap/tank?ResetPostSnap=false").await;

    let (status, body) = get(&app, "/postsnap/tank?ResetPreSnap=maybe").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_flag");
    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presnap("tank", 1)));
    assert!(!metrics.contains("znapzend_postsnap_command_finished{job=\"tank\"}"));
}

#[tokio::test]
async fn test_invalid_duration_rejected() {
    let app = app();

    let (status, body) = get(&app, "/presnap/tank?SelfResetAfter=whenever").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "invalid_duration");
    assert!(!scrape(&app).await.contains("job=\"tank\""));
}

#[tokio::test]
async fn test_negative_delay_disables_self_reset() {
    let app = app();

    let (status, body) = get(&app, "/presnap/tank?SelfResetAfter=-5s").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("self_reset_after_ms").is_none());
}

#[tokio::test]
async fn test_snapshot_report_ignores_target_host() {
    let app = app();
    get(&app, "/postsend/tank?TargetHost=hostA&ResetPreSnap=false&ResetPostSnap=false").await;

    let (status, body) = get(&app, "/presnap/tank?TargetHost=hostA").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("target_host").is_none());
    let metrics = scrape(&app).await;
    assert!(metrics.contains(&postsend("tank", "hostA", 1)));
    assert!(metrics.contains(&postsend("tank", "", 0)));
}

#[tokio::test]
async fn test_missing_job_name() {
    let app = app();

    for uri in ["/presnap", "/presnap/", "/presend/", "/register", "/unregister/"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "missing Job name in URL", "{uri}");
    }
}

#[tokio::test]
async fn test_self_reset_after() {
    let app = app();

    let (status, body) = get(&app, "/presend/tank?TargetHost=hostA&SelfResetAfter=100ms").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["self_reset_after_ms"], 100);
    assert!(scrape(&app).await.contains(&presend("tank", "hostA", 1)));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(scrape(&app).await.contains(&presend("tank", "hostA", 0)));
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_then_unregister() {
    let app = app();

    let (status, body) = get(&app, "/register/pool").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "registered");
    assert_eq!(body["job"], "pool");
    assert_eq!(body["primed"], json!(["presnap", "postsnap"]));

    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presnap("pool", 0)));
    assert!(metrics.contains(&postsnap("pool", 0)));

    let (status, body) = get(&app, "/unregister/pool").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "unregistered", "job": "pool"}));
    assert!(!scrape(&app).await.contains("job=\"pool\""));
}

#[tokio::test]
async fn test_register_with_host_primes_send_series() {
    let app = app();

    let (status, body) = get(&app, "/register/pool?TargetHost=backup01").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["primed"].as_array().unwrap().len(), 4);
    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presend("pool", "backup01", 0)));
    assert!(metrics.contains(&postsend("pool", "backup01", 0)));
}

#[tokio::test]
async fn test_unregister_unknown_job() {
    let app = app();

    let (status, body) = get(&app, "/unregister/ghost").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unregistered");
    assert!(!scrape(&app).await.contains("ghost"));
}

#[tokio::test]
async fn test_startup_jobs_visible_on_first_scrape() {
    let app = app_with(ExporterSettings {
        startup_jobs: znapzend_exporter_core::config::StartupJob::parse_list("tank,pool@backup01")
            .unwrap(),
        ..ExporterSettings::default()
    });

    let metrics = scrape(&app).await;
    assert!(metrics.contains(&presnap("tank", 0)));
    assert!(metrics.contains(&presend("pool", "backup01", 0)));
}

#[tokio::test]
async fn test_series_limit() {
    let app = app_with(ExporterSettings {
        max_jobs: 1,
        ..ExporterSettings::default()
    });
    get(&app, "/presnap/tank").await;

    let (status, body) = get(&app, "/presnap/pool").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_type"], "series_limit_exceeded");

    let (status, body) = get(&app, "/register/pool").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["job"], "pool");

    // Known jobs keep working
    let (status, _) = get(&app, "/postsnap/tank").await;
    assert_eq!(status, StatusCode::OK);

    get(&app, "/unregister/tank").await;
    let (status, _) = get(&app, "/register/pool").await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Probes, banner and fallback
// ============================================================================

#[tokio::test]
async fn test_root_banner() {
    let (status, body) = get(&app(), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "exporter reachable. You might want to check /metrics"
    );
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_probes() {
    let app = app();

    let (status, body) = get(&app, "/health/alive").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");

    let (status, body) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_metrics_content_type() {
    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("application/openmetrics-text"));
}

#[tokio::test]
async fn test_unknown_route() {
    let (status, body) = get(&app(), "/snapshot/tank").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
}
