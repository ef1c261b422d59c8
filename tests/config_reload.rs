//! Hot reload of admission settings.

use std::time::Duration;

use axum::http::StatusCode;

mod common;

use common::{client, evaluator, spawn_server, test_config, StubControlPlane, TOKEN};

async fn status_with(server: &common::TestServer, token: &str) -> StatusCode {
    client()
        .get(server.component_url("default", "api"))
        .header("Authorization", format!("Basic {token}"))
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_rotated_token_applies_without_restart() {
    let (checker, _) = evaluator(StubControlPlane::with_workload("api").instance("api-0", true));
    let server = spawn_server(test_config(), checker).await;

    assert_eq!(status_with(&server, TOKEN).await, StatusCode::OK);

    let mut rotated = test_config();
    rotated.auth.token = "rotated".to_string();
    server.config_tx.send(rotated).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(status_with(&server, TOKEN).await, StatusCode::FORBIDDEN);
    assert_eq!(status_with(&server, "rotated").await, StatusCode::OK);
}

#[tokio::test]
async fn test_unchanged_limits_keep_counting_across_reload() {
    let mut config = test_config();
    config.rate_limit.limit = 2;
    config.rate_limit.period_secs = 60;

    let (checker, _) = evaluator(StubControlPlane::with_workload("api").instance("api-0", true));
    let server = spawn_server(config.clone(), checker).await;

    assert_eq!(status_with(&server, TOKEN).await, StatusCode::OK);

    config.auth.token = "rotated".to_string();
    server.config_tx.send(config.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(status_with(&server, "rotated").await, StatusCode::OK);
    assert_eq!(
        status_with(&server, "rotated").await,
        StatusCode::TOO_MANY_REQUESTS
    );

    // A new quota starts a fresh window.
    config.rate_limit.limit = 5;
    server.config_tx.send(config).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(status_with(&server, "rotated").await, StatusCode::OK);
}
