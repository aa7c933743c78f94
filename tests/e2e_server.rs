//! E2E tests for static files, metrics and unknown routes

mod common;

use common::{STYLESHEET, TestServer};

#[tokio::test]
async fn test_static_files_are_served() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/static/css/style.css"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), STYLESHEET);
}

#[tokio::test]
async fn test_missing_static_file_is_404() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/static/missing.js"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/unknown/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_login_requires_post() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/login")).send().await.unwrap();

    assert_eq!(response.status(), 405);
}

#[tokio::test]
async fn test_metrics_endpoint_reports_logins() {
    sessiongate::metrics::init_metrics();
    let server = TestServer::new().await;
    server.login("alice", "x").await;

    let response = server.client.get(server.url("/metrics")).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("sessiongate_logins_total"));
}
