//! Outbound request descriptors and the Authorization attach step.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use tracing::warn;

use super::ApiError;

/// Path of the token refresh endpoint. Requests to it are never renewed.
pub const REFRESH_PATH: &str = "/auth/jwt/refresh/";

/// How many times a request may be resent after renewing its token.
pub const MAX_AUTH_RETRIES: u8 = 1;

/// Method, path, JSON body and headers of one API call.
///
/// The session manager only ever touches the `Authorization` header.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// True for calls to the refresh endpoint itself.
    pub fn is_refresh_call(&self) -> bool {
        self.path.trim_end_matches('/') == REFRESH_PATH.trim_end_matches('/')
    }
}

/// Which send of a request this is. Starts at zero; each token renewal
/// moves it forward by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attempt(u8);

impl Attempt {
    pub fn first() -> Self {
        Self(0)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Whether a 401 on this attempt may trigger a renewal.
    pub fn can_renew(self) -> bool {
        self.0 < MAX_AUTH_RETRIES
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Set `Authorization: Bearer <token>` when a token is present.
///
/// Replaces any existing Authorization value rather than appending. Without a
/// token the headers are left exactly as they were. Never fails: a token that
/// cannot be a header value is logged and skipped.
pub fn authorize(headers: &mut HeaderMap, token: Option<&str>) {
    let Some(token) = token else {
        return;
    };
    match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Err(_) => warn!("Stored access token is not a valid header value; sending without it"),
    }
}
