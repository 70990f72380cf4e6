//! HTTP transport types and the injected transport boundary.
//!
//! # Design
//! Requests and responses are plain data. The pipeline builds an
//! `HttpRequest`, hands it to whatever `Transport` the client was constructed
//! with, and gets an `HttpResponse` back. Nothing here touches the network,
//! which keeps the pipeline testable with a scripted transport.
//!
//! Headers are kept as ordered `(name, value)` pairs; lookups are
//! case-insensitive.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Methods that never carry a request body.
    pub fn is_bodyless(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: Option<String>,
        bytes: Bytes,
    },
}

/// A multipart form; the transport picks the boundary and content type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pub parts: Vec<FormPart>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        });
        self
    }
}

/// A request payload.
///
/// `Json` is encoded by the pipeline. `Form`, `Blob`, `Bytes` and
/// `UrlEncoded` are binary kinds: they reach the transport untouched and the
/// pipeline never forces a JSON content type onto them.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// Already-encoded text; sent with whatever content type the headers say.
    Text(String),
    UrlEncoded(Vec<(String, String)>),
    Form(FormData),
    Blob {
        content_type: Option<String>,
        bytes: Bytes,
    },
    Bytes(Bytes),
}

impl RequestBody {
    /// Serialize any value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            RequestBody::UrlEncoded(_)
                | RequestBody::Form(_)
                | RequestBody::Blob { .. }
                | RequestBody::Bytes(_)
        )
    }
}

/// An HTTP request described as plain data, ready for dispatch.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Whether the transport should attach ambient credentials (cookies).
    pub with_credentials: bool,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    /// The media type of the body, lowercased and without parameters.
    pub fn media_type(&self) -> Option<String> {
        self.header("content-type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// Case-insensitive header lookup.
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Insert or replace a header, matching names case-insensitively.
pub fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

pub fn remove_header(headers: &mut Vec<(String, String)>, name: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
}

/// Executes one HTTP round-trip.
///
/// Implementations must return 4xx/5xx responses as data rather than errors;
/// `ApiError::Transport` is reserved for failures to complete the exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(content_type: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: Bytes::new(),
        }
    }

    #[test]
    fn media_type_strips_parameters_and_case() {
        let resp = response_with("Application/JSON; charset=utf-8");
        assert_eq!(resp.media_type().as_deref(), Some("application/json"));
    }

    #[test]
    fn media_type_is_none_without_header() {
        let resp = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: Bytes::new(),
        };
        assert!(resp.media_type().is_none());
        assert!(resp.ok());
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut headers = vec![("content-type".to_string(), "text/plain".to_string())];
        set_header(&mut headers, "Content-Type", "application/json");
        assert_eq!(headers.len(), 1);
        assert_eq!(header_value(&headers, "CONTENT-TYPE"), Some("application/json"));
        remove_header(&mut headers, "Content-type");
        assert!(headers.is_empty());
    }

    #[test]
    fn binary_kinds_are_recognised() {
        assert!(RequestBody::Bytes(Bytes::from_static(b"x")).is_binary());
        assert!(RequestBody::Form(FormData::new().text("a", "b")).is_binary());
        assert!(RequestBody::UrlEncoded(Vec::new()).is_binary());
        assert!(!RequestBody::Json(serde_json::json!({})).is_binary());
        assert!(!RequestBody::Text("x".into()).is_binary());
    }

    #[test]
    fn get_and_head_are_bodyless() {
        assert!(HttpMethod::Get.is_bodyless());
        assert!(HttpMethod::Head.is_bodyless());
        assert!(!HttpMethod::Delete.is_bodyless());
    }
}
