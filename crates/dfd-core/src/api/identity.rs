//! Unauthenticated calls to the identity endpoints.
//!
//! Nothing here goes through the session manager's renewal logic: token
//! creation and refresh must never recurse into themselves, and the account
//! flows (signup, activation, password reset) run before a session exists.

use std::sync::Arc;

use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::auth::validation;
use crate::auth::TokenPair;
use crate::models::NewAccount;

use super::request::REFRESH_PATH;
use super::{ApiError, Result};

const CREATE_TOKEN_PATH: &str = "/auth/jwt/create/";
const VERIFY_TOKEN_PATH: &str = "/auth/jwt/verify/";
const REGISTER_PATH: &str = "/auth/users/";
const ACTIVATION_PATH: &str = "/auth/users/activation/";
const RESET_PASSWORD_PATH: &str = "/auth/users/reset_password/";
const RESET_PASSWORD_CONFIRM_PATH: &str = "/auth/users/reset_password_confirm/";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
    refresh: String,
}

/// Result of a refresh call. `refresh` is set when the server rotates it.
#[derive(Deserialize)]
pub struct RenewedToken {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Serialize)]
struct PasswordResetConfirm<'a> {
    uid: &'a str,
    token: &'a str,
    new_password: &'a str,
    re_new_password: &'a str,
}

/// Client for the JWT and account endpoints.
/// Clone is cheap - the HTTP client and base URL are both shared.
#[derive(Clone)]
pub struct IdentityService {
    client: Client,
    base_url: Arc<str>,
}

impl IdentityService {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response).await)
        }
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self
            .client
            .post(self.url(path))
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        Self::check_response(response).await
    }

    /// Exchange credentials for an access/refresh pair.
    pub async fn create_token(&self, email: &str, password: &str) -> Result<TokenPair> {
        let response = self
            .post_json(CREATE_TOKEN_PATH, &json!({ "email": email, "password": password }))
            .await?;
        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse token response: {}", e)))?;
        Ok(TokenPair::new(tokens.access, tokens.refresh))
    }

    /// Trade a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh: &str) -> Result<RenewedToken> {
        let response = self
            .post_json(REFRESH_PATH, &json!({ "refresh": refresh }))
            .await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse refresh response: {}", e)))
    }

    /// Ask the server whether a token is still accepted.
    pub async fn verify_token(&self, token: &str) -> Result<bool> {
        let response = self
            .client
            .post(self.url(VERIFY_TOKEN_PATH))
            .json(&json!({ "token": token }))
            .send()
            .await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => Ok(false),
            _ => Err(ApiError::from_response(response).await),
        }
    }

    /// Create an account. The server emails an activation link.
    pub async fn register(&self, account: &NewAccount) -> Result<()> {
        validation::validate_username(&account.name)?;
        validation::validate_email(&account.email)?;
        validation::validate_new_password(&account.password)?;
        validation::validate_password_confirmation(&account.password, &account.password_confirmation)?;

        self.post_json(REGISTER_PATH, account).await?;
        debug!(email = %account.email, "Account registered");
        Ok(())
    }

    /// Activate an account with the uid/token pair from the activation email.
    pub async fn activate(&self, uid: &str, token: &str) -> Result<()> {
        if uid.is_empty() || token.is_empty() {
            return Err(ApiError::Validation("activation uid and token are required".into()));
        }
        self.post_json(ACTIVATION_PATH, &json!({ "uid": uid, "token": token }))
            .await?;
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        validation::validate_email(email)?;
        self.post_json(RESET_PASSWORD_PATH, &json!({ "email": email }))
            .await?;
        Ok(())
    }

    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        re_new_password: &str,
    ) -> Result<()> {
        validation::validate_new_password(new_password)?;
        validation::validate_password_confirmation(new_password, re_new_password)?;

        let body = PasswordResetConfirm {
            uid,
            token,
            new_password,
            re_new_password,
        };
        self.post_json(RESET_PASSWORD_CONFIRM_PATH, &body).await?;
        Ok(())
    }
}
