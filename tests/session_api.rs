//! Tests for the JSON API: panels, session issue and validation.

use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;
use common::{addon, closed_port, config, TestIngress, API_KEY};

#[tokio::test]
async fn session_endpoints_require_privileged_caller() {
    let ingress = TestIngress::start(config(vec![])).await;

    let res = ingress.client.post(ingress.url("/session")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = ingress
        .client
        .post(ingress.url("/session"))
        .bearer_auth("wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = ingress
        .client
        .post(ingress.url("/session"))
        .header("X-Supervisor-Token", API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn issued_session_validates_and_forgery_does_not() {
    let ingress = TestIngress::start(config(vec![])).await;
    let session = ingress.session().await;
    assert_eq!(session.len(), 128);
    assert!(session.chars().all(|c| c.is_ascii_hexdigit()));

    let res = ingress
        .client
        .post(ingress.url("/validate_session"))
        .bearer_auth(API_KEY)
        .json(&json!({ "session": session }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "result": "ok", "data": {} }));

    let res = ingress
        .client
        .post(ingress.url("/validate_session"))
        .bearer_auth(API_KEY)
        .json(&json!({ "session": "0".repeat(128) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn validate_rejects_malformed_body() {
    let ingress = TestIngress::start(config(vec![])).await;

    let res = ingress
        .client
        .post(ingress.url("/validate_session"))
        .bearer_auth(API_KEY)
        .json(&json!({ "session": "abc", "extra": true }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
    assert_ne!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn panels_lists_addons_by_slug() {
    let ingress = TestIngress::start(config(vec![
        addon("core_ssh", "t1", closed_port(), false),
        addon("vscode", "t2", closed_port(), true),
    ]))
    .await;

    let res = ingress.client.get(ingress.url("/panels")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"], "ok");
    let panels = &body["data"]["panels"];
    assert_eq!(panels.as_object().unwrap().len(), 2);
    assert_eq!(
        panels["core_ssh"],
        json!({ "title": "CORE_SSH", "icon": "mdi:puzzle", "admin": false, "enable": true })
    );
    assert_eq!(panels["vscode"]["title"], "VSCODE");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let ingress = TestIngress::start(config(vec![])).await;

    let res = ingress.client.get(ingress.url("/panels")).send().await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));

    let res = ingress
        .client
        .get(ingress.url("/panels"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");
}
