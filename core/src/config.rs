//! Client-wide and per-call configuration.
//!
//! # Design
//! `ClientConfig` is fixed once the client is built and can be loaded from a
//! JSON settings document (camelCase keys, every field optional).
//! `RequestConfig` describes a single call and is moved through the
//! interceptor stages by value, so a stage can only hand a new config to the
//! next one and never reach back into the caller's copy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::{HttpMethod, RequestBody};
use crate::url_builder::{QueryValue, UrlBuilder};

/// How much of the pipeline runs for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// The transport response after the raw-response hooks.
    Raw,
    /// The decoded body, unclassified.
    Object,
    /// The envelope's data field, after response hooks and classification.
    #[default]
    Data,
}

/// Where the code, message and payload live inside a decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFields {
    pub code: String,
    pub message: String,
    pub data: String,
}

impl Default for ResponseFields {
    fn default() -> Self {
        Self {
            code: "code".to_string(),
            message: "message".to_string(),
            data: "data".to_string(),
        }
    }
}

pub const DEFAULT_SUCCESS_CODES: [i64; 2] = [0, 200];
pub const DEFAULT_SLOW_REQUEST_MS: u64 = 100;

/// Settings for one `RequestClient`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    pub base_url: String,
    pub response_type: ResponseType,
    pub response_fields: Option<ResponseFields>,
    pub with_credentials: bool,
    pub success_codes: Vec<i64>,
    pub slow_request_threshold_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            response_type: ResponseType::Data,
            response_fields: Some(ResponseFields::default()),
            with_credentials: false,
            success_codes: DEFAULT_SUCCESS_CODES.to_vec(),
            slow_request_threshold_ms: DEFAULT_SLOW_REQUEST_MS,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Load settings from a JSON document; missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        serde_json::from_str(raw).map_err(|e| ApiError::Config(e.to_string()))
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn response_fields(mut self, fields: Option<ResponseFields>) -> Self {
        self.response_fields = fields;
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    pub fn success_codes(mut self, codes: impl Into<Vec<i64>>) -> Self {
        self.success_codes = codes.into();
        self
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_threshold_ms)
    }

    /// Check the settings are usable. Called once by `RequestClient::new`.
    pub fn validate(&self) -> Result<(), ApiError> {
        UrlBuilder::create_from_base(&self.base_url)?;
        if self.response_type == ResponseType::Data {
            self.envelope()?;
        }
        Ok(())
    }

    /// The envelope contract needed to classify `data` responses.
    pub(crate) fn envelope(&self) -> Result<(&ResponseFields, &[i64]), ApiError> {
        let fields = self.response_fields.as_ref().ok_or_else(|| {
            ApiError::Config("response type `data` requires response fields".to_string())
        })?;
        if self.success_codes.is_empty() {
            return Err(ApiError::Config(
                "response type `data` requires at least one success code".to_string(),
            ));
        }
        Ok((fields, self.success_codes.as_slice()))
    }
}

/// Description of one outgoing call.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<RequestBody>,
    pub query: Vec<(String, QueryValue)>,
    pub headers: Vec<(String, String)>,
    /// Overrides the client's `with_credentials` default when set.
    pub with_credentials: Option<bool>,
    /// Overrides the client's `response_type` default when set.
    pub response_type: Option<ResponseType>,
    /// Log the request and response even when the call succeeds.
    pub verbose: bool,
}

impl RequestConfig {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
            query: Vec::new(),
            headers: Vec::new(),
            with_credentials: None,
            response_type: None,
            verbose: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, ApiError> {
        Ok(self.body(RequestBody::json(value)?))
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = Some(with_credentials);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
