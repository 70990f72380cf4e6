//! Session credentials and the hooks that use them.
//!
//! # Design
//! The session token lives behind `CredentialStore` so the pipeline never
//! depends on where a host keeps it. `BearerAuth` attaches it to credentialed
//! calls; `AuthInterceptor` watches decoded bodies for the backend's
//! authentication-failure envelope, expires the token and aborts the call
//! with `ApiError::SessionExpired`. What a redirect means is left to the
//! caller.
//!
//! The failure envelope is recognised by the literal `code` and `message`
//! keys, whatever field names the client's envelope is configured with.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RequestConfig;
use crate::error::ApiError;
use crate::http::set_header;
use crate::interceptor::{AuthRequestHook, ResponseHook};
use crate::response::{coerce_code, ResponseBody};

pub const DEFAULT_LOGIN_PATH: &str = "/login";

const UNAUTHENTICATED_CODE: f64 = 401.0;
const SERVER_ERROR_CODE: f64 = 500.0;
const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated";

/// Where the session token is kept.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: String);
    /// Invalidate the stored token.
    fn expire(&self);
}

/// In-process credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn expire(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// True for `{code: 401}` and `{code: 500, message: "Not authenticated"}`.
pub fn is_auth_failure(body: &Value) -> bool {
    let Some(object) = body.as_object() else {
        return false;
    };
    match object.get("code").and_then(coerce_code) {
        Some(code) if code == UNAUTHENTICATED_CODE => true,
        Some(code) if code == SERVER_ERROR_CODE => {
            object.get("message").and_then(Value::as_str) == Some(NOT_AUTHENTICATED_MESSAGE)
        }
        _ => false,
    }
}

/// Response hook converting the auth-failure envelope into `SessionExpired`.
///
/// Register it first so no later hook sees the failure payload.
#[derive(Clone)]
pub struct AuthInterceptor {
    store: Arc<dyn CredentialStore>,
    redirect_to: String,
}

impl AuthInterceptor {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            redirect_to: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }
}

#[async_trait]
impl ResponseHook for AuthInterceptor {
    async fn on_response(&self, body: ResponseBody) -> Result<ResponseBody, ApiError> {
        if !body.as_json().is_some_and(is_auth_failure) {
            return Ok(body);
        }
        self.store.expire();
        warn!(redirect_to = %self.redirect_to, "backend reported an unauthenticated session");
        Err(ApiError::SessionExpired {
            redirect_to: self.redirect_to.clone(),
        })
    }
}

/// Auth-request hook attaching `Authorization: Bearer <token>`.
///
/// Without a stored token the call is refused with `SessionExpired` before
/// anything is sent.
#[derive(Clone)]
pub struct BearerAuth {
    store: Arc<dyn CredentialStore>,
    redirect_to: String,
}

impl BearerAuth {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            redirect_to: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }
}

#[async_trait]
impl AuthRequestHook for BearerAuth {
    async fn authorize(&self, mut config: RequestConfig) -> Result<RequestConfig, ApiError> {
        let Some(token) = self.store.token() else {
            debug!(path = %config.path, "no session token for credentialed call");
            return Err(ApiError::SessionExpired {
                redirect_to: self.redirect_to.clone(),
            });
        };
        set_header(&mut config.headers, "Authorization", &format!("Bearer {token}"));
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::header_value;

    fn store() -> Arc<MemoryCredentialStore> {
        Arc::new(MemoryCredentialStore::with_token("t0ken"))
    }

    #[test]
    fn recognises_both_failure_shapes() {
        assert!(is_auth_failure(&json!({"code": 401})));
        assert!(is_auth_failure(&json!({"code": 401, "message": "whatever"})));
        assert!(is_auth_failure(&json!({"code": 500, "message": "Not authenticated"})));
        assert!(!is_auth_failure(&json!({"code": 500, "message": "disk full"})));
        assert!(!is_auth_failure(&json!({"code": 0, "data": {}})));
        assert!(!is_auth_failure(&json!([401])));
    }

    #[tokio::test]
    async fn failure_expires_token_and_signals_redirect() {
        let store = store();
        let hook = AuthInterceptor::new(store.clone()).redirect_to("/signin");

        let err = hook
            .on_response(ResponseBody::Json(json!({"code": 500, "message": "Not authenticated"})))
            .await
            .unwrap_err();

        match err {
            ApiError::SessionExpired { redirect_to } => assert_eq!(redirect_to, "/signin"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.token().is_none());
    }

    #[tokio::test]
    async fn other_bodies_pass_through_untouched() {
        let store = store();
        let hook = AuthInterceptor::new(store.clone());
        let body = ResponseBody::Json(json!({"code": 1, "message": "boom"}));

        let out = hook.on_response(body.clone()).await.unwrap();
        assert_eq!(out, body);
        assert_eq!(store.token().as_deref(), Some("t0ken"));

        let text = ResponseBody::Text("401".into());
        assert_eq!(hook.on_response(text.clone()).await.unwrap(), text);
    }

    #[tokio::test]
    async fn bearer_auth_injects_header() {
        let hook = BearerAuth::new(store());
        let config = hook.authorize(RequestConfig::get("/scans")).await.unwrap();
        assert_eq!(header_value(&config.headers, "authorization"), Some("Bearer t0ken"));
    }

    #[tokio::test]
    async fn bearer_auth_without_token_refuses() {
        let store = Arc::new(MemoryCredentialStore::new());
        let hook = BearerAuth::new(store);
        let err = hook.authorize(RequestConfig::get("/scans")).await.unwrap_err();
        assert!(err.is_session_expired());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryCredentialStore::new();
        assert!(store.token().is_none());
        store.set_token("abc".into());
        assert_eq!(store.token().as_deref(), Some("abc"));
        store.expire();
        assert!(store.token().is_none());
    }
}
