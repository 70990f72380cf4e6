//! Deterministic absolute-URL assembly.
//!
//! # Design
//! `UrlBuilder` is a consuming builder: scheme, authority, path segments and
//! query parameters are collected as plain strings and only concatenated in
//! `build()`. Query parameters use set semantics (last write wins, the key
//! keeps its first position) except while seeding from a base URL, where the
//! first occurrence of a repeated key is kept.

use std::fmt;

use tracing::warn;
use url::{form_urlencoded, Url};

use crate::error::UrlError;

/// A query parameter value. Only strings, numbers and booleans are allowed.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(s) => f.write_str(s),
            QueryValue::Int(n) => write!(f, "{n}"),
            // Whole floats render without a fractional part: 2.0 -> "2",
            // 1e20 -> "100000000000000000000".
            QueryValue::Float(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.0}"),
            QueryValue::Float(n) => write!(f, "{n}"),
            QueryValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

/// Builder for absolute URLs.
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    secure: bool,
    authority: Option<String>,
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl UrlBuilder {
    /// An empty builder for manual assembly.
    pub fn create() -> Self {
        Self::default()
    }

    /// A builder seeded from `base`; equivalent to `create().base_url(base)`.
    pub fn create_from_base(base: &str) -> Result<Self, UrlError> {
        Self::create().base_url(base)
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the authority (`host[:port]`).
    ///
    /// A full URL is tolerated: only its authority is kept and a warning is
    /// emitted, so the result never carries two schemes.
    pub fn domain(mut self, host: &str) -> Self {
        let authority = if host.contains("://") {
            let authority = extract_authority(host);
            warn!(input = host, authority = %authority, "domain() received a full URL, keeping only its authority");
            authority
        } else {
            host.trim_matches('/').to_string()
        };
        self.authority = (!authority.is_empty()).then_some(authority);
        self
    }

    /// Append one path segment. Leading and trailing slashes are trimmed;
    /// empty segments are ignored.
    pub fn path(mut self, segment: &str) -> Self {
        let trimmed = segment.trim_matches('/');
        if !trimmed.is_empty() {
            self.segments.push(trimmed.to_string());
        }
        self
    }

    pub fn paths<I, S>(self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .fold(self, |builder, segment| builder.path(segment.as_ref()))
    }

    /// Set a query parameter, overwriting any earlier value for `key`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        let key = key.into();
        let value = value.into().to_string();
        match self.query.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.query.push((key, value)),
        }
        self
    }

    pub fn params<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        params
            .into_iter()
            .fold(self, |builder, (key, value)| builder.param(key, value))
    }

    /// Seed scheme, authority, path segments and query parameters from a
    /// full `http` or `https` URL. Any other scheme is `MalformedUrl`;
    /// userinfo in the authority is not carried over.
    pub fn base_url(mut self, base: &str) -> Result<Self, UrlError> {
        let malformed = |reason: String| UrlError::MalformedUrl {
            url: base.to_string(),
            reason,
        };
        let parsed = Url::parse(base).map_err(|e| malformed(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| malformed("URL has no host".to_string()))?;

        self.secure = match parsed.scheme() {
            "https" => true,
            "http" => false,
            _ => return Err(malformed("unsupported scheme".to_string())),
        };
        self.authority = Some(match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        });
        if let Some(segments) = parsed.path_segments() {
            self = self.paths(segments);
        }
        for (key, value) in parsed.query_pairs() {
            if !self.query.iter().any(|(k, _)| *k == key) {
                self.query.push((key.into_owned(), value.into_owned()));
            }
        }
        Ok(self)
    }

    pub fn build(&self) -> Result<String, UrlError> {
        let authority = self.authority.as_deref().ok_or(UrlError::MissingHost)?;
        let scheme = if self.secure { "https" } else { "http" };

        let mut url = format!("{scheme}://{authority}");
        for segment in &self.segments {
            url.push('/');
            url.push_str(segment);
        }
        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }
}

/// Pull `host[:port]` out of something that looks like a full URL.
fn extract_authority(input: &str) -> String {
    if let Ok(parsed) = Url::parse(input) {
        if let Some(host) = parsed.host_str() {
            return match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
        }
    }
    let rest = input.split_once("://").map_or(input, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or_default().to_string()
}
