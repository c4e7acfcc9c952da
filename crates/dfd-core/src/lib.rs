//! Data for Dummies core library.
//!
//! Authenticated access to the Data for Dummies API: token storage, bearer
//! attachment, and refresh-and-retry with a single shared refresh call when
//! several requests find their token expired at once.
//!
//! ```no_run
//! use dfd_core::{auth::MemoryStore, ClientConfig, SessionManager};
//!
//! # async fn run() -> Result<(), dfd_core::ApiError> {
//! let session = SessionManager::new(&ClientConfig::default(), Box::new(MemoryStore::new()))?;
//! let user = session.login("a@b.com", "pw").await?;
//! println!("signed in as {}", user.display_name());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, ApiRequest, SessionManager};
pub use config::ClientConfig;
pub use models::AuthenticatedUser;
