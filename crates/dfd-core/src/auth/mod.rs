//! Authentication module for managing tokens and credential storage.
//!
//! This module provides:
//! - `CredentialStore`: pluggable persistence for the access/refresh slots
//! - `TokenVault`: the in-memory token pair, updated atomically with the store
//! - `validation`: client-side checks for emails, usernames and passwords
//!
//! Token expiry is reactive only: a token is considered expired when the
//! server answers 401.

pub mod credentials;
pub mod session;
pub mod validation;

pub use credentials::{CredentialStore, FileStore, KeyringStore, MemoryStore, TokenKey};
pub use session::{TokenPair, TokenVault};
