use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use super::credentials::{CredentialStore, TokenKey};

/// The access/refresh credential pair.
///
/// `access == None` means the caller is unauthenticated; `refresh == None`
/// means the session cannot be renewed without logging in again.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Some(access.into()),
            refresh: Some(refresh.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access.is_some()
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh.is_some()
    }

    fn slot(&self, key: TokenKey) -> Option<&str> {
        match key {
            TokenKey::Access => self.access.as_deref(),
            TokenKey::Refresh => self.refresh.as_deref(),
        }
    }
}

// Never print token material
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &self.access.as_ref().map(|_| "<redacted>"))
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Owns the credential store and the in-memory copy of the token pair.
///
/// Every mutation rewrites the persistent slots and the in-memory pair while
/// holding one write lock, so readers always get a consistent pair.
pub struct TokenVault {
    store: Box<dyn CredentialStore>,
    pair: RwLock<TokenPair>,
}

impl TokenVault {
    /// Load whatever the store currently holds. Unreadable slots count as empty.
    pub fn load(store: Box<dyn CredentialStore>) -> Self {
        let mut pair = TokenPair::default();
        for key in TokenKey::ALL {
            let value = match store.get(key) {
                Ok(value) => value,
                Err(e) => {
                    warn!(slot = %key, error = %e, "Failed to read stored token");
                    None
                }
            };
            match key {
                TokenKey::Access => pair.access = value,
                TokenKey::Refresh => pair.refresh = value,
            }
        }
        debug!(
            has_access = pair.access.is_some(),
            has_refresh = pair.refresh.is_some(),
            "Token vault loaded"
        );

        Self {
            store,
            pair: RwLock::new(pair),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TokenPair> {
        self.pair.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TokenPair> {
        self.pair.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Consistent copy of both tokens.
    pub fn snapshot(&self) -> TokenPair {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// Replace the whole pair, as after a successful login.
    pub fn store_pair(&self, pair: TokenPair) {
        let mut current = self.write();
        self.persist(&pair);
        *current = pair;
        debug!("Stored new token pair");
    }

    /// Install a refreshed access token (and rotated refresh token, if any),
    /// but only while `expected_refresh` is still the stored refresh token.
    ///
    /// Returns false when the session was cleared or replaced while the
    /// refresh call was in flight; nothing is written in that case.
    pub fn rotate(
        &self,
        expected_refresh: &str,
        access: String,
        rotated_refresh: Option<String>,
    ) -> bool {
        let mut current = self.write();
        if current.refresh.as_deref() != Some(expected_refresh) {
            debug!("Refresh token changed during renewal; discarding new access token");
            return false;
        }
        let next = TokenPair {
            access: Some(access),
            refresh: rotated_refresh.or_else(|| current.refresh.clone()),
        };
        self.persist(&next);
        *current = next;
        debug!("Rotated access token");
        true
    }

    /// Drop both tokens after a failed renewal, unless the session behind
    /// `expected_refresh` was already replaced. Returns whether it cleared.
    pub fn invalidate(&self, expected_refresh: &str) -> bool {
        let mut current = self.write();
        if current.refresh.as_deref() != Some(expected_refresh) {
            return false;
        }
        self.clear_locked(&mut current);
        true
    }

    /// Drop both tokens. Never fails; store errors are logged.
    pub fn clear(&self) {
        let mut current = self.write();
        self.clear_locked(&mut current);
    }

    fn clear_locked(&self, current: &mut TokenPair) {
        for key in TokenKey::ALL {
            if let Err(e) = self.store.clear(key) {
                warn!(slot = %key, error = %e, "Failed to clear stored token");
            }
        }
        *current = TokenPair::default();
        debug!("Cleared token pair");
    }

    fn persist(&self, pair: &TokenPair) {
        for key in TokenKey::ALL {
            let result = match pair.slot(key) {
                Some(value) => self.store.set(key, value),
                None => self.store.clear(key),
            };
            if let Err(e) = result {
                warn!(slot = %key, error = %e, "Failed to persist token");
            }
        }
    }
}

impl fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVault").field("pair", &*self.read()).finish()
    }
}
