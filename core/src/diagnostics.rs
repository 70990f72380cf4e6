//! Structured request/response records for the log.
//!
//! Binary bodies are never written out; they show up as `[Binary Data]`.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, RequestBody};
use crate::response::ResponseBody;

pub(crate) const BINARY_PLACEHOLDER: &str = "[Binary Data]";

/// What was sent, captured before the request is handed to the transport.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RequestSnapshot {
    pub request_id: Uuid,
    pub method: &'static str,
    pub url: String,
    pub headers: Map<String, Value>,
    pub body: Value,
}

impl RequestSnapshot {
    pub fn of(request_id: Uuid, request: &HttpRequest) -> Self {
        Self {
            request_id,
            method: request.method.as_str(),
            url: request.url.clone(),
            headers: header_map(&request.headers),
            body: request.body.as_ref().map_or(Value::Null, body_summary),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseRecord<'a> {
    status: u16,
    ok: bool,
    headers: Map<String, Value>,
    body: Option<&'a ResponseBody>,
}

#[derive(Debug, Serialize)]
struct ExchangeRecord<'a> {
    request: &'a RequestSnapshot,
    response: ResponseRecord<'a>,
}

fn body_summary(body: &RequestBody) -> Value {
    match body {
        RequestBody::Json(value) => value.clone(),
        RequestBody::Text(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        _ => Value::String(BINARY_PLACEHOLDER.to_string()),
    }
}

fn header_map(headers: &[(String, String)]) -> Map<String, Value> {
    headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), Value::String(v.clone())))
        .collect()
}

fn render(
    request: &RequestSnapshot,
    response: &HttpResponse,
    body: Option<&ResponseBody>,
) -> String {
    let record = ExchangeRecord {
        request,
        response: ResponseRecord {
            status: response.status,
            ok: response.ok(),
            headers: header_map(&response.headers),
            body,
        },
    };
    serde_json::to_string(&record).unwrap_or_else(|e| format!("<unserializable record: {e}>"))
}

/// Record a call that went through, only used for verbose calls.
pub(crate) fn log_exchange(
    request: &RequestSnapshot,
    response: &HttpResponse,
    body: &ResponseBody,
) {
    debug!(
        request_id = %request.request_id,
        method = request.method,
        url = %request.url,
        status = response.status,
        record = %render(request, response, Some(body)),
        "request completed"
    );
}

/// Record a classified failure. Always emitted.
pub(crate) fn log_failure(
    request: &RequestSnapshot,
    response: &HttpResponse,
    body: Option<&ResponseBody>,
    err: &ApiError,
) {
    error!(
        request_id = %request.request_id,
        method = request.method,
        url = %request.url,
        status = response.status,
        error = %err,
        record = %render(request, response, body),
        "request failed"
    );
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::http::{FormData, HttpMethod};

    fn request(body: Option<RequestBody>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: "http://x.com/upload".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
            with_credentials: false,
        }
    }

    #[test]
    fn binary_bodies_are_redacted() {
        for body in [
            RequestBody::Bytes(Bytes::from_static(b"\x00\x01")),
            RequestBody::Form(FormData::new().text("a", "b")),
            RequestBody::Blob {
                content_type: None,
                bytes: Bytes::new(),
            },
        ] {
            let snapshot = RequestSnapshot::of(Uuid::nil(), &request(Some(body)));
            assert_eq!(snapshot.body, json!(BINARY_PLACEHOLDER));
        }
    }

    #[test]
    fn encoded_json_is_logged_structurally() {
        let snapshot = RequestSnapshot::of(
            Uuid::nil(),
            &request(Some(RequestBody::Text(r#"{"target":"10.0.0.1"}"#.to_string()))),
        );
        assert_eq!(snapshot.body, json!({"target": "10.0.0.1"}));
        assert_eq!(snapshot.headers["content-type"], json!("application/json"));
        assert_eq!(snapshot.method, "POST");
    }

    #[test]
    fn rendered_record_carries_response_metadata() {
        let snapshot = RequestSnapshot::of(Uuid::nil(), &request(None));
        let response = HttpResponse {
            status: 500,
            headers: vec![("X-Id".to_string(), "7".to_string())],
            body: Bytes::new(),
        };
        let body = ResponseBody::Json(json!({"code": 1}));
        let record: Value = serde_json::from_str(&render(&snapshot, &response, Some(&body))).unwrap();
        assert_eq!(record["request"]["url"], "http://x.com/upload");
        assert_eq!(record["request"]["body"], Value::Null);
        assert_eq!(record["response"]["status"], 500);
        assert_eq!(record["response"]["ok"], false);
        assert_eq!(record["response"]["headers"]["x-id"], "7");
        assert_eq!(record["response"]["body"]["code"], 1);
    }
}
