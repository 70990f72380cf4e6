//! Body decoding and envelope classification.
//!
//! # Design
//! Decoding is driven by the response `Content-Type` only: JSON and plain
//! text are understood, everything else is refused. Classification reads
//! the code field named by `ResponseFields`, so the same code serves any
//! backend envelope shape.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ResponseFields;
use crate::error::ApiError;
use crate::http::HttpResponse;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    /// Collapse into a JSON value; text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }
}

/// What a call resolved to, depending on its response type.
#[derive(Debug, Clone)]
pub enum Reply {
    Raw(HttpResponse),
    Body(ResponseBody),
    /// The envelope's data field. `None` when the field was absent.
    Data(Option<Value>),
}

impl Reply {
    /// Deserialize a decoded reply into `T`. An absent data field
    /// deserializes as JSON `null`, so `Option<T>` maps it to `None`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            Reply::Raw(_) => {
                return Err(ApiError::Deserialization(
                    "a raw transport response has no decoded body".to_string(),
                ))
            }
            Reply::Body(body) => body.into_value(),
            Reply::Data(data) => data.unwrap_or(Value::Null),
        };
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Decode the body according to its declared media type.
pub fn decode(response: &HttpResponse) -> Result<ResponseBody, ApiError> {
    let media_type = response.media_type().unwrap_or_default();
    match media_type.as_str() {
        "application/json" => serde_json::from_slice(&response.body)
            .map(ResponseBody::Json)
            .map_err(|e| ApiError::Deserialization(e.to_string())),
        "text/plain" => Ok(ResponseBody::Text(
            String::from_utf8_lossy(&response.body).into_owned(),
        )),
        _ => Err(ApiError::UnsupportedResponseType {
            content_type: media_type,
        }),
    }
}

/// Numeric value of an envelope code. Numbers and numeric strings count;
/// anything else has no numeric value and is never a success code.
/// Unlike JavaScript `Number()`, `null`, `false` and `""` do not become 0
/// and `true` does not become 1.
pub fn coerce_code(code: &Value) -> Option<f64> {
    match code {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Classify a decoded body against the envelope contract, returning the
/// data field on success.
pub fn classify(
    body: &ResponseBody,
    fields: &ResponseFields,
    success_codes: &[i64],
) -> Result<Option<Value>, ApiError> {
    let invalid = || ApiError::InvalidResponseFormat {
        code_field: fields.code.clone(),
    };
    let object = body.as_json().and_then(Value::as_object).ok_or_else(invalid)?;
    let code = object.get(&fields.code).ok_or_else(invalid)?;

    let is_success = coerce_code(code)
        .is_some_and(|numeric| success_codes.iter().any(|ok| *ok as f64 == numeric));
    if is_success {
        return Ok(object.get(&fields.data).cloned());
    }

    let message = match object.get(&fields.message) {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Null) | None => format!("request failed with code {code}"),
        Some(other) => other.to_string(),
    };
    Err(ApiError::Backend {
        code: Some(code.clone()),
        message,
    })
}
