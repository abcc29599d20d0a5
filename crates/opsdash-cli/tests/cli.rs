//! CLI integration tests against a mock dashboard API.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{Sandbox, run_cli, stderr, stdout};

#[tokio::test(flavor = "multi_thread")]
async fn test_login_writes_session_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "username": "ops", "password": "hunter2" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "a1", "refreshToken": "r1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    let output = run_cli(
        &["login", "--username", "ops", "--password", "hunter2"],
        &sandbox,
        &server.uri(),
    )
    .await;

    assert!(output.status.success(), "Login failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Logged in successfully"));

    let session = sandbox.session().expect("session file written");
    assert_eq!(session["accessToken"], "a1");
    assert_eq!(session["refreshToken"], "r1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "bad password" })))
        .mount(&server)
        .await;
    Mock::given(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sandbox = Sandbox::new();
    let output = run_cli(
        &["login", "--username", "ops", "--password", "wrong"],
        &sandbox,
        &server.uri(),
    )
    .await;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid credentials"));
    assert!(sandbox.session().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_get_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(header("Authorization", "Bearer a1"))
        .and(header("X-Trace", "t-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "web-1" }])))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_tokens("a1", "r1");
    let output = run_cli(
        &["api", "get", "/servers", "-H", "X-Trace: t-1"],
        &sandbox,
        &server.uri(),
    )
    .await;

    assert!(output.status.success(), "api failed: {}", stderr(&output));
    let body: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(body, json!([{ "name": "web-1" }]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_refreshes_expired_token_and_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "fresh" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_tokens("stale", "r1");
    let output = run_cli(&["api", "get", "/servers"], &sandbox, &server.uri()).await;

    assert!(output.status.success(), "api failed: {}", stderr(&output));
    assert!(stdout(&output).contains(r#"{"count":2}"#));

    let session = sandbox.session().unwrap();
    assert_eq!(session["accessToken"], "fresh");
    assert_eq!(session["refreshToken"], "r1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_api_no_refresh_reports_401() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/servers/7"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_tokens("stale", "r1");
    let output = run_cli(
        &["api", "delete", "/servers/7", "--no-refresh"],
        &sandbox,
        &server.uri(),
    )
    .await;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("HTTP 401"));
    // The session is left alone.
    assert_eq!(sandbox.session().unwrap()["accessToken"], "stale");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_refresh_expires_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/servers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "revoked" })))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_tokens("stale", "revoked");
    let output = run_cli(&["api", "get", "/servers"], &sandbox, &server.uri()).await;

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Session expired. Run 'opsdash login' again."));
    assert!(!sandbox.session_file.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_command_rotates_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "a2", "refreshToken": "r2" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_tokens("a1", "r1");
    let output = run_cli(&["refresh"], &sandbox, &server.uri()).await;

    assert!(output.status.success(), "refresh failed: {}", stderr(&output));
    let session = sandbox.session().unwrap();
    assert_eq!(session["accessToken"], "a2");
    assert_eq!(session["refreshToken"], "r2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_and_logout() {
    let server = MockServer::start().await;
    let sandbox = Sandbox::with_tokens("a1", "r1");

    let output = run_cli(&["whoami"], &sandbox, &server.uri()).await;
    assert!(output.status.success(), "whoami failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("authenticated"));
    assert!(out.contains(&server.uri()));

    let output = run_cli(&["logout"], &sandbox, &server.uri()).await;
    assert!(output.status.success(), "logout failed: {}", stderr(&output));
    assert!(!sandbox.session_file.exists());

    let output = run_cli(&["whoami"], &sandbox, &server.uri()).await;
    assert!(output.status.success());
    assert!(stdout(&output).contains("anonymous"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_after_expiry_reports_anonymous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let sandbox = Sandbox::with_tokens("a1", "revoked");
    let output = run_cli(&["refresh"], &sandbox, &server.uri()).await;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Session expired"));

    // Expiry is not persisted; the next process only sees the missing file.
    let output = run_cli(&["whoami"], &sandbox, &server.uri()).await;
    assert!(output.status.success(), "whoami failed: {}", stderr(&output));
    assert!(stdout(&output).contains("anonymous"));

    let output = run_cli(&["whoami", "--help"], &sandbox, &server.uri()).await;
    assert!(stdout(&output).contains("after an expiry this"));
}
