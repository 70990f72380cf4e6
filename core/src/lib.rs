//! Request pipeline for the scan console API.
//!
//! # Overview
//! Every call the console makes goes through `RequestClient`: the request
//! is shaped by interceptor hooks, its URL assembled by `UrlBuilder`, the
//! round-trip executed by an injected `Transport`, and the decoded body
//! classified against the backend's `{code, message, data}` envelope.
//!
//! # Design
//! - The transport, the credential store and the log sink (`tracing`'s
//!   dispatcher) are all supplied from outside, so the pipeline runs against
//!   a scripted transport in tests.
//! - Four hook kinds, one trait each, run in registration order.
//! - `ResponseType` decides how far a call goes: `raw`, `object` or `data`.
//! - `AuthInterceptor` turns the backend's unauthenticated envelope into
//!   `ApiError::SessionExpired`; the host decides how to redirect.

pub mod auth;
pub mod client;
pub mod config;
mod diagnostics;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod response;
#[cfg(feature = "reqwest")]
pub mod transport;
pub mod url_builder;

pub use auth::{AuthInterceptor, BearerAuth, CredentialStore, MemoryCredentialStore};
pub use client::RequestClient;
pub use config::{ClientConfig, RequestConfig, ResponseFields, ResponseType};
pub use error::{ApiError, UrlError};
pub use http::{FormData, FormPart, HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport};
pub use interceptor::{AuthRequestHook, Interceptors, RawResponseHook, RequestHook, ResponseHook};
pub use response::{Reply, ResponseBody};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use url_builder::{QueryValue, UrlBuilder};
