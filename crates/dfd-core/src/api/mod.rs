//! REST API client module for the Data for Dummies backend.
//!
//! This module provides the `SessionManager`, which owns the stored tokens
//! and turns `ApiRequest`s into authenticated calls, plus the unauthenticated
//! `IdentityService` endpoints and the contacts API.
//!
//! The API uses JWT bearer tokens issued by the `/auth/jwt/` endpoints.

pub mod client;
pub mod contacts;
pub mod error;
pub mod identity;
pub mod request;

pub use client::SessionManager;
pub use error::{ApiError, Result};
pub use identity::{IdentityService, RenewedToken};
pub use request::{authorize, ApiRequest, Attempt};
