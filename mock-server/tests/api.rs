use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, ScanTask, SESSION_TOKEN};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn bearer() -> String {
    format!("Bearer {SESSION_TOKEN}")
}

fn authed(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, bearer())
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn anonymous(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- auth ---

#[tokio::test]
async fn list_scans_without_token_answers_401_envelope() {
    let resp = app().oneshot(anonymous("/api/scans")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 401);
    assert!(envelope.get("data").is_none());
}

#[tokio::test]
async fn session_route_reports_not_authenticated() {
    let resp = app().oneshot(anonymous("/api/session")).await.unwrap();

    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 500);
    assert_eq!(envelope["message"], "Not authenticated");
}

// --- scans ---

#[tokio::test]
async fn list_scans_empty() {
    let resp = app().oneshot(authed("GET", "/api/scans", "")).await.unwrap();

    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 0);
    assert_eq!(envelope["data"], serde_json::json!([]));
}

#[tokio::test]
async fn create_scan_wraps_task_in_envelope() {
    let resp = app()
        .oneshot(authed("POST", "/api/scans", r#"{"target":"10.0.0.1"}"#))
        .await
        .unwrap();

    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 0);
    let scan: ScanTask = serde_json::from_value(envelope["data"].clone()).unwrap();
    assert_eq!(scan.target, "10.0.0.1");
    assert_eq!(scan.profile, "quick");
}

#[tokio::test]
async fn create_scan_with_blank_target_is_backend_failure() {
    let resp = app()
        .oneshot(authed("POST", "/api/scans", r#"{"target":"  "}"#))
        .await
        .unwrap();

    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 1001);
    assert_eq!(envelope["message"], "target must not be empty");
}

#[tokio::test]
async fn create_scan_malformed_json_returns_422() {
    let resp = app()
        .oneshot(authed("POST", "/api/scans", r#"{"not_target":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_scan_not_found() {
    let resp = app()
        .oneshot(authed(
            "GET",
            "/api/scans/00000000-0000-0000-0000-000000000000",
            "",
        ))
        .await
        .unwrap();

    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 404);
    assert_eq!(envelope["message"], "scan not found");
}

#[tokio::test]
async fn get_scan_bad_uuid_returns_400() {
    let resp = app()
        .oneshot(authed("GET", "/api/scans/not-a-uuid", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- content types ---

#[tokio::test]
async fn ping_is_plain_text() {
    let resp = app().oneshot(anonymous("/api/ping")).await.unwrap();

    let content_type = resp.headers()[http::header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_bytes(resp).await, "pong");
}

#[tokio::test]
async fn report_is_xml() {
    let resp = app().oneshot(anonymous("/api/report.xml")).await.unwrap();

    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/xml");
}

#[tokio::test]
async fn echo_reports_content_type_and_query() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/echo?a=1&b=two")
                .header(http::header::CONTENT_TYPE, "application/octet-stream")
                .body("12345".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["data"]["contentType"], "application/octet-stream");
    assert_eq!(envelope["data"]["bodyLength"], 5);
    assert_eq!(envelope["data"]["query"], "a=1&b=two");
}

// --- full lifecycle ---

#[tokio::test]
async fn scan_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("POST", "/api/scans", r#"{"target":"example.org","profile":"full"}"#))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    let created: ScanTask = serde_json::from_value(envelope["data"].clone()).unwrap();
    assert_eq!(created.profile, "full");
    let id = created.id;

    // list: should contain the one scan
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/scans", ""))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    let scans: Vec<ScanTask> = serde_json::from_value(envelope["data"].clone()).unwrap();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].id, id);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("DELETE", &format!("/api/scans/{id}"), ""))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 0);

    // get after delete: backend reports 404 in the envelope
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", &format!("/api/scans/{id}"), ""))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["code"], 404);
}
