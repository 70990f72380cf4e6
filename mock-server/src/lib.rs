use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// The only bearer token the mock backend accepts.
pub const SESSION_TOKEN: &str = "console-session";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Queued,
    Running,
    Finished,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanTask {
    pub id: Uuid,
    pub target: String,
    pub profile: String,
    pub status: ScanStatus,
}

#[derive(Deserialize)]
pub struct CreateScan {
    pub target: String,
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_profile() -> String {
    "quick".to_string()
}

/// The backend's response wrapper: `{code, message, data?}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

type Reply<T> = Result<Json<Envelope<T>>, Json<Envelope<()>>>;

fn ok<T>(data: T) -> Reply<T> {
    Ok(Json(Envelope {
        code: 0,
        message: "ok".to_string(),
        data: Some(data),
    }))
}

fn fail(code: i64, message: &str) -> Json<Envelope<()>> {
    Json(Envelope {
        code,
        message: message.to_string(),
        data: None,
    })
}

fn authorize(headers: &HeaderMap) -> Result<(), Json<Envelope<()>>> {
    let expected = format!("Bearer {SESSION_TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(fail(401, "Unauthorized")),
    }
}

pub type Db = Arc<RwLock<HashMap<Uuid, ScanTask>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/api/scans", get(list_scans).post(create_scan))
        .route("/api/scans/{id}", get(get_scan).delete(delete_scan))
        .route("/api/session", get(session_lost))
        .route("/api/fail", get(backend_failure))
        .route("/api/bare", get(bare_object))
        .route("/api/ping", get(ping))
        .route("/api/report.xml", get(xml_report))
        .route("/api/echo", post(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock backend listening");
    }
    axum::serve(listener, app()).await
}

async fn list_scans(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<ScanTask>> {
    authorize(&headers)?;
    let scans = db.read().await;
    ok(scans.values().cloned().collect())
}

async fn create_scan(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateScan>,
) -> Reply<ScanTask> {
    authorize(&headers)?;
    if input.target.trim().is_empty() {
        return Err(fail(1001, "target must not be empty"));
    }
    let scan = ScanTask {
        id: Uuid::new_v4(),
        target: input.target,
        profile: input.profile,
        status: ScanStatus::Queued,
    };
    db.write().await.insert(scan.id, scan.clone());
    ok(scan)
}

async fn get_scan(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Reply<ScanTask> {
    authorize(&headers)?;
    let scans = db.read().await;
    match scans.get(&id) {
        Some(scan) => ok(scan.clone()),
        None => Err(fail(404, "scan not found")),
    }
}

async fn delete_scan(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Json<Envelope<()>> {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    match db.write().await.remove(&id) {
        Some(_) => Json(Envelope {
            code: 0,
            message: "deleted".to_string(),
            data: None,
        }),
        None => fail(404, "scan not found"),
    }
}

async fn session_lost() -> Json<Envelope<()>> {
    fail(500, "Not authenticated")
}

async fn backend_failure() -> Json<Envelope<()>> {
    fail(1, "boom")
}

async fn bare_object() -> Json<Value> {
    Json(json!({ "id": 1, "name": "no envelope" }))
}

async fn ping() -> &'static str {
    "pong"
}

async fn xml_report() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], "<report/>")
}

/// Reports what arrived so callers can check encoding decisions.
async fn echo(headers: HeaderMap, RawQuery(query): RawQuery, body: Bytes) -> Reply<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    ok(json!({
        "contentType": content_type,
        "bodyLength": body.len(),
        "query": query,
    }))
}
