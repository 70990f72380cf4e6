//! Hook contracts and the ordered collections the client runs them from.
//!
//! # Design
//! Each pipeline stage has its own named hook trait. A hook receives the
//! value flowing through its stage and returns the same or a modified value;
//! returning an error aborts the whole call and the client passes it on
//! untouched. Plain synchronous closures implement the traits directly, so
//! most hooks are one-liners at registration time.
//!
//! Collections are append-only. The auth-request hook is a single slot.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RequestConfig;
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::response::ResponseBody;

/// Runs once before the request hooks, only for credentialed calls.
#[async_trait]
pub trait AuthRequestHook: Send + Sync {
    async fn authorize(&self, config: RequestConfig) -> Result<RequestConfig, ApiError>;
}

/// Rewrites the outgoing request description.
#[async_trait]
pub trait RequestHook: Send + Sync {
    async fn on_request(&self, config: RequestConfig) -> Result<RequestConfig, ApiError>;
}

/// Sees the transport response before the body is decoded.
#[async_trait]
pub trait RawResponseHook: Send + Sync {
    async fn on_raw_response(&self, response: HttpResponse) -> Result<HttpResponse, ApiError>;
}

/// Sees the decoded body before envelope classification.
#[async_trait]
pub trait ResponseHook: Send + Sync {
    async fn on_response(&self, body: ResponseBody) -> Result<ResponseBody, ApiError>;
}

#[async_trait]
impl<F> AuthRequestHook for F
where
    F: Fn(RequestConfig) -> Result<RequestConfig, ApiError> + Send + Sync,
{
    async fn authorize(&self, config: RequestConfig) -> Result<RequestConfig, ApiError> {
        self(config)
    }
}

#[async_trait]
impl<F> RequestHook for F
where
    F: Fn(RequestConfig) -> Result<RequestConfig, ApiError> + Send + Sync,
{
    async fn on_request(&self, config: RequestConfig) -> Result<RequestConfig, ApiError> {
        self(config)
    }
}

#[async_trait]
impl<F> RawResponseHook for F
where
    F: Fn(HttpResponse) -> Result<HttpResponse, ApiError> + Send + Sync,
{
    async fn on_raw_response(&self, response: HttpResponse) -> Result<HttpResponse, ApiError> {
        self(response)
    }
}

#[async_trait]
impl<F> ResponseHook for F
where
    F: Fn(ResponseBody) -> Result<ResponseBody, ApiError> + Send + Sync,
{
    async fn on_response(&self, body: ResponseBody) -> Result<ResponseBody, ApiError> {
        self(body)
    }
}

/// The four hook collections of a client.
#[derive(Clone, Default)]
pub struct Interceptors {
    auth_request: Option<Arc<dyn AuthRequestHook>>,
    request: Vec<Arc<dyn RequestHook>>,
    raw_response: Vec<Arc<dyn RawResponseHook>>,
    response: Vec<Arc<dyn ResponseHook>>,
}

impl Interceptors {
    pub fn set_auth_request(&mut self, hook: impl AuthRequestHook + 'static) {
        self.auth_request = Some(Arc::new(hook));
    }

    pub fn add_request(&mut self, hook: impl RequestHook + 'static) {
        self.request.push(Arc::new(hook));
    }

    pub fn add_raw_response(&mut self, hook: impl RawResponseHook + 'static) {
        self.raw_response.push(Arc::new(hook));
    }

    pub fn add_response(&mut self, hook: impl ResponseHook + 'static) {
        self.response.push(Arc::new(hook));
    }

    pub(crate) async fn authorize(&self, config: RequestConfig) -> Result<RequestConfig, ApiError> {
        match &self.auth_request {
            Some(hook) => hook.authorize(config).await,
            None => Ok(config),
        }
    }

    pub(crate) async fn run_request(
        &self,
        mut config: RequestConfig,
    ) -> Result<RequestConfig, ApiError> {
        for hook in &self.request {
            config = hook.on_request(config).await?;
        }
        Ok(config)
    }

    pub(crate) async fn run_raw_response(
        &self,
        mut response: HttpResponse,
    ) -> Result<HttpResponse, ApiError> {
        for hook in &self.raw_response {
            response = hook.on_raw_response(response).await?;
        }
        Ok(response)
    }

    pub(crate) async fn run_response(
        &self,
        mut body: ResponseBody,
    ) -> Result<ResponseBody, ApiError> {
        for hook in &self.response {
            body = hook.on_response(body).await?;
        }
        Ok(body)
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("auth_request", &self.auth_request.is_some())
            .field("request", &self.request.len())
            .field("raw_response", &self.raw_response.len())
            .field("response", &self.response.len())
            .finish()
    }
}
