//! Session manager for authenticated calls to the Data for Dummies API.
//!
//! Every outbound request picks up the stored access token. A 401 triggers at
//! most one token renewal per request, and concurrent 401s share a single
//! refresh call instead of racing each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, TokenPair, TokenVault};
use crate::config::ClientConfig;
use crate::models::AuthenticatedUser;

use super::identity::IdentityService;
use super::request::{authorize, ApiRequest, Attempt};
use super::{ApiError, Result};

const ME_PATH: &str = "/auth/users/me/";

/// Why a shared renewal produced no token. Clone so every waiter gets a copy.
#[derive(Debug, Clone)]
struct RenewalFailure(String);

type RenewalFuture = Shared<BoxFuture<'static, std::result::Result<String, RenewalFailure>>>;

struct InFlightRenewal {
    id: u64,
    /// Refresh token the call was made with
    refresh: String,
    future: RenewalFuture,
}

struct Inner {
    identity: IdentityService,
    vault: TokenVault,
    renewal: Mutex<Option<InFlightRenewal>>,
    next_renewal_id: AtomicU64,
    user: RwLock<Option<AuthenticatedUser>>,
}

/// Owns the credential store and produces authenticated requests.
/// Clone is cheap - all clones share the same tokens and in-flight renewal.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a session manager, loading any tokens the store already holds.
    pub fn new(config: &ClientConfig, store: Box<dyn CredentialStore>) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self::with_client(client, &config.base_url, store))
    }

    /// Create a session manager sharing an existing connection pool.
    pub fn with_client(client: Client, base_url: &str, store: Box<dyn CredentialStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                identity: IdentityService::new(client, base_url),
                vault: TokenVault::load(store),
                renewal: Mutex::new(None),
                next_renewal_id: AtomicU64::new(1),
                user: RwLock::new(None),
            }),
        }
    }

    /// Endpoints that run without a session (signup, activation, password reset).
    pub fn identity(&self) -> &IdentityService {
        &self.inner.identity
    }

    pub fn base_url(&self) -> &str {
        self.inner.identity.base_url()
    }

    /// Consistent copy of the stored tokens.
    pub fn tokens(&self) -> TokenPair {
        self.inner.vault.snapshot()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.vault.is_authenticated()
    }

    /// The user fetched by the last successful login or `current_user` call.
    pub fn cached_user(&self) -> Option<AuthenticatedUser> {
        self.inner.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_cached_user(&self, user: Option<AuthenticatedUser>) {
        *self.inner.user.write().unwrap_or_else(|e| e.into_inner()) = user;
    }

    /// Forget any in-flight renewal so the next 401 starts from the current tokens.
    /// Requests already waiting on it keep their own handle.
    fn detach_renewal(&self) {
        let mut slot = self.inner.renewal.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(in_flight) = slot.take() {
            debug!(renewal = in_flight.id, "Detached in-flight token renewal");
        }
    }

    // ===== Session API =====

    /// Log in with email and password, then fetch the signed-in user.
    ///
    /// Nothing is stored unless the token endpoint accepts the credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser> {
        let pair = self.inner.identity.create_token(email, password).await?;
        self.inner.vault.store_pair(pair);
        self.detach_renewal();
        info!(email = %email, "Logged in");

        let user: AuthenticatedUser = self.get(ME_PATH).await?;
        self.set_cached_user(Some(user.clone()));
        Ok(user)
    }

    /// Forget both tokens and the cached user. Always succeeds.
    pub fn logout(&self) {
        self.inner.vault.clear();
        self.detach_renewal();
        self.set_cached_user(None);
        info!("Logged out");
    }

    /// Ask the server who the current token belongs to.
    ///
    /// Any failure, including an expired session, reads as "no user". With no
    /// access token stored no request is made at all.
    pub async fn current_user(&self) -> Option<AuthenticatedUser> {
        if !self.inner.vault.is_authenticated() {
            debug!("No access token stored; skipping user lookup");
            self.set_cached_user(None);
            return None;
        }

        match self.get::<AuthenticatedUser>(ME_PATH).await {
            Ok(user) => {
                self.set_cached_user(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                debug!(error = %e, "Current user lookup failed");
                self.set_cached_user(None);
                None
            }
        }
    }

    /// Renew the access token now, joining any renewal already in flight.
    pub async fn refresh(&self) -> Result<()> {
        let used = self.inner.vault.access_token();
        self.renew(used.as_deref())
            .await
            .map(|_| ())
            .map_err(|RenewalFailure(reason)| ApiError::RefreshFailed(reason))
    }

    /// Check the stored access token against the server without renewing it.
    pub async fn verify(&self) -> bool {
        let Some(token) = self.inner.vault.access_token() else {
            return false;
        };
        match self.inner.identity.verify_token(&token).await {
            Ok(valid) => valid,
            Err(e) => {
                debug!(error = %e, "Token verification failed");
                false
            }
        }
    }

    // ===== Request pipeline =====

    /// Send a request with the stored token, renewing once on 401.
    ///
    /// Returns the successful response, or the error for the final attempt.
    /// When renewal fails the original 401 is returned as `Unauthorized`.
    pub async fn send(&self, request: ApiRequest) -> Result<Response> {
        let mut attempt = Attempt::first();
        let mut token = self.inner.vault.access_token();

        loop {
            let response = self.transmit(&request, token.as_deref(), attempt).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED
                && attempt.can_renew()
                && !request.is_refresh_call()
            {
                match self.renew(token.as_deref()).await {
                    Ok(fresh) => {
                        debug!(path = %request.path, "Retrying with renewed token");
                        token = Some(fresh);
                        attempt = attempt.next();
                        continue;
                    }
                    Err(RenewalFailure(reason)) => {
                        debug!(path = %request.path, reason = %reason, "Renewal failed");
                        return Err(ApiError::Unauthorized);
                    }
                }
            }

            return Err(ApiError::from_response(response).await);
        }
    }

    /// Send a request and decode the JSON response.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", path, e)))
    }

    /// Send a request whose response body is not needed.
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<()> {
        self.send(request).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(ApiRequest::post(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(ApiRequest::delete(path).json(body)?).await
    }

    async fn transmit(&self, request: &ApiRequest, token: Option<&str>, attempt: Attempt) -> Result<Response> {
        let mut headers = request.headers.clone();
        authorize(&mut headers, token);

        debug!(
            method = %request.method,
            path = %request.path,
            attempt = attempt.number(),
            authenticated = token.is_some(),
            "Sending API request"
        );

        let identity = &self.inner.identity;
        let mut builder = identity
            .client()
            .request(request.method.clone(), identity.url(&request.path))
            .headers(headers);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    // ===== Token renewal =====

    /// Produce an access token to retry with after `used` was rejected.
    ///
    /// Joins the in-flight renewal if it was started from the refresh token
    /// stored now. Otherwise, if another request already installed a
    /// different access token, that token is returned without a network call;
    /// failing that a new renewal replaces whatever sat in the slot.
    async fn renew(&self, used: Option<&str>) -> std::result::Result<String, RenewalFailure> {
        let (id, future) = {
            let mut slot = self.inner.renewal.lock().unwrap_or_else(|e| e.into_inner());
            let pair = self.inner.vault.snapshot();
            let joinable = slot
                .as_ref()
                .filter(|in_flight| pair.refresh.as_deref() == Some(in_flight.refresh.as_str()));
            match joinable {
                Some(in_flight) => {
                    debug!(renewal = in_flight.id, "Joining in-flight token renewal");
                    (in_flight.id, in_flight.future.clone())
                }
                None => {
                    if let Some(current) = pair.access {
                        if used != Some(current.as_str()) {
                            debug!("Access token already renewed by another request");
                            return Ok(current);
                        }
                    }
                    let Some(refresh) = pair.refresh else {
                        return Err(RenewalFailure("no refresh token stored".to_string()));
                    };

                    let id = self.inner.next_renewal_id.fetch_add(1, Ordering::Relaxed);
                    debug!(renewal = id, "Starting token renewal");
                    let future = Self::run_renewal(Arc::clone(&self.inner), refresh.clone())
                        .boxed()
                        .shared();
                    *slot = Some(InFlightRenewal {
                        id,
                        refresh,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let outcome = future.await;

        let mut slot = self.inner.renewal.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().map(|in_flight| in_flight.id) == Some(id) {
            *slot = None;
        }
        outcome
    }

    /// The single refresh call behind a shared renewal.
    async fn run_renewal(inner: Arc<Inner>, refresh: String) -> std::result::Result<String, RenewalFailure> {
        match inner.identity.refresh_token(&refresh).await {
            Ok(renewed) => {
                if inner.vault.rotate(&refresh, renewed.access.clone(), renewed.refresh) {
                    info!("Access token renewed");
                    Ok(renewed.access)
                } else {
                    Err(RenewalFailure("session ended while renewing".to_string()))
                }
            }
            Err(e) => {
                warn!(error = %e, "Token renewal failed; clearing session");
                if inner.vault.invalidate(&refresh) {
                    *inner.user.write().unwrap_or_else(|e| e.into_inner()) = None;
                }
                Err(RenewalFailure(e.to_string()))
            }
        }
    }
}
