//! The single funnel every outgoing call passes through.
//!
//! # Design
//! `RequestClient` holds an immutable `ClientConfig`, the hook collections
//! and the injected `Transport`. A call moves its `RequestConfig` through
//! the stages by value:
//!
//! 1. merge client defaults (credentials flag, JSON content type);
//! 2. auth-request hook, for credentialed calls only;
//! 3. request hooks;
//! 4. URL assembly and body encoding;
//! 5. dispatch, timed;
//! 6. raw-response hooks; `raw` calls stop here;
//! 7. decoding; `object` calls stop here;
//! 8. response hooks and envelope classification.
//!
//! Nothing is retried and no hook error is masked. Shared state is read-only
//! while calls are in flight, so any number of them may run concurrently.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ClientConfig, RequestConfig, ResponseType};
use crate::diagnostics::{log_exchange, log_failure, RequestSnapshot};
use crate::error::ApiError;
use crate::http::{
    header_value, remove_header, set_header, HttpRequest, HttpResponse, RequestBody, Transport,
};
use crate::interceptor::{
    AuthRequestHook, Interceptors, RawResponseHook, RequestHook, ResponseHook,
};
use crate::response::{classify, decode, Reply};
use crate::url_builder::UrlBuilder;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Request pipeline bound to one backend.
#[derive(Clone)]
pub struct RequestClient {
    config: ClientConfig,
    interceptors: Interceptors,
    transport: Arc<dyn Transport>,
}

impl RequestClient {
    /// Validate `config` and bind it to `transport`.
    ///
    /// Fails with `ApiError::Config` when the default response type is
    /// `data` but the envelope fields or success codes are missing, and with
    /// `ApiError::Url` when the base URL does not parse.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            config,
            interceptors: Interceptors::default(),
            transport,
        })
    }

    /// A client dispatching through a default `ReqwestTransport`.
    #[cfg(feature = "reqwest")]
    pub fn with_reqwest(config: ClientConfig) -> Result<Self, ApiError> {
        Self::new(config, Arc::new(crate::transport::ReqwestTransport::new()?))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    pub fn set_auth_request_interceptor(&mut self, hook: impl AuthRequestHook + 'static) {
        self.interceptors.set_auth_request(hook);
    }

    pub fn add_request_interceptor(&mut self, hook: impl RequestHook + 'static) {
        self.interceptors.add_request(hook);
    }

    pub fn add_raw_response_interceptor(&mut self, hook: impl RawResponseHook + 'static) {
        self.interceptors.add_raw_response(hook);
    }

    pub fn add_response_interceptor(&mut self, hook: impl ResponseHook + 'static) {
        self.interceptors.add_response(hook);
    }

    /// Run the full pipeline for one call.
    pub async fn send(&self, config: RequestConfig) -> Result<Reply, ApiError> {
        let request_id = Uuid::new_v4();
        let span = debug_span!("request", %request_id, method = %config.method, path = %config.path);
        self.execute(request_id, config).instrument(span).await
    }

    /// Run the pipeline and deserialize the result into `T`.
    pub async fn request<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<T, ApiError> {
        self.send(config).await?.into_typed()
    }

    /// Run the pipeline with the `raw` response type.
    pub async fn request_raw(&self, config: RequestConfig) -> Result<HttpResponse, ApiError> {
        match self.send(config.response_type(ResponseType::Raw)).await? {
            Reply::Raw(response) => Ok(response),
            _ => Err(ApiError::Interceptor(
                "a request hook changed the response type of a raw call".to_string(),
            )),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestConfig::get(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.request(RequestConfig::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        self.request(RequestConfig::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestConfig::delete(path)).await
    }

    async fn execute(&self, request_id: Uuid, config: RequestConfig) -> Result<Reply, ApiError> {
        let config = self.merge_defaults(config);
        let config = if config.with_credentials == Some(true) {
            self.interceptors.authorize(config).await?
        } else {
            config
        };
        let config = self.interceptors.run_request(config).await?;

        let response_type = config.response_type.unwrap_or(self.config.response_type);
        let envelope = match response_type {
            ResponseType::Data => Some(self.config.envelope()?),
            ResponseType::Raw | ResponseType::Object => None,
        };
        let verbose = config.verbose;

        let request = self.build_request(config)?;
        let snapshot = RequestSnapshot::of(request_id, &request);

        let started = Instant::now();
        let response = self.transport.send(request).await?;
        let elapsed = started.elapsed();
        if elapsed > self.config.slow_request_threshold() {
            warn!(
                url = %snapshot.url,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow request"
            );
        }

        let response = self.interceptors.run_raw_response(response).await?;
        if response_type == ResponseType::Raw {
            return Ok(Reply::Raw(response));
        }

        let body = decode(&response).inspect_err(|err| log_failure(&snapshot, &response, None, err))?;
        if verbose {
            log_exchange(&snapshot, &response, &body);
        }

        let Some((fields, success_codes)) = envelope else {
            return Ok(Reply::Body(body));
        };
        let body = self.interceptors.run_response(body).await?;
        classify(&body, fields, success_codes)
            .map(Reply::Data)
            .inspect_err(|err| log_failure(&snapshot, &response, Some(&body), err))
    }

    /// Apply the client's credentials default and default headers; the
    /// caller's headers win, except that a binary body never goes out
    /// labelled as JSON.
    fn merge_defaults(&self, mut config: RequestConfig) -> RequestConfig {
        config
            .with_credentials
            .get_or_insert(self.config.with_credentials);

        let binary = config.body.as_ref().is_some_and(RequestBody::is_binary);
        let mut headers = Vec::with_capacity(config.headers.len() + 1);
        if !binary {
            headers.push(("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        for (name, value) in &config.headers {
            set_header(&mut headers, name, value);
        }
        if binary && header_value(&headers, "Content-Type") == Some(JSON_CONTENT_TYPE) {
            remove_header(&mut headers, "Content-Type");
        }
        config.headers = headers;
        config
    }

    /// Assemble the URL and encode the body.
    fn build_request(&self, config: RequestConfig) -> Result<HttpRequest, ApiError> {
        let url = UrlBuilder::create_from_base(&self.config.base_url)?
            .path(&config.path)
            .params(config.query)
            .build()?;

        let mut headers = config.headers;
        let body = match config.body {
            _ if config.method.is_bodyless() => None,
            Some(RequestBody::Json(value)) => {
                let encoded = serde_json::to_string(&value)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                set_header(&mut headers, "Content-Type", JSON_CONTENT_TYPE);
                Some(RequestBody::Text(encoded))
            }
            other => other,
        };

        Ok(HttpRequest {
            method: config.method,
            url,
            headers,
            body,
            with_credentials: config.with_credentials.unwrap_or(self.config.with_credentials),
        })
    }
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("config", &self.config)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}
