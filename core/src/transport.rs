//! `Transport` backed by a shared `reqwest::Client`.
//!
//! HTTP error statuses come back as ordinary responses; only failures to
//! complete the exchange become `ApiError::Transport`. reqwest has no
//! per-request credentials mode, so `HttpRequest::with_credentials` is not
//! consulted here.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use tracing::trace;

use crate::error::ApiError;
use crate::http::{header_value, FormData, FormPart, HttpRequest, HttpResponse, RequestBody, Transport};

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().build().map_err(transport_error)?;
        Ok(Self { client })
    }

    /// Reuse an already configured client (proxies, TLS roots, timeouts).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

fn multipart(form: FormData) -> Result<Form, ApiError> {
    form.parts.into_iter().try_fold(Form::new(), |form, part| {
        Ok(match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let mut file = Part::bytes(bytes.to_vec()).file_name(file_name);
                if let Some(content_type) = content_type {
                    file = file.mime_str(&content_type).map_err(transport_error)?;
                }
                form.part(name, file)
            }
        })
    })
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            ..
        } = request;
        trace!(%method, %url, "dispatching");

        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let has_content_type = header_value(&headers, "content-type").is_some();

        let mut builder = self.client.request(method, url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Text(text)) => builder.body(text),
            Some(RequestBody::UrlEncoded(pairs)) => builder.form(&pairs),
            Some(RequestBody::Form(form)) => builder.multipart(multipart(form)?),
            Some(RequestBody::Blob {
                content_type,
                bytes,
            }) => match content_type {
                Some(content_type) if !has_content_type => {
                    builder.header(CONTENT_TYPE, content_type).body(bytes)
                }
                _ => builder.body(bytes),
            },
            Some(RequestBody::Bytes(bytes)) => builder.body(bytes),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
