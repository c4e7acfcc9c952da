//! Data models for Data for Dummies entities.
//!
//! - `AuthenticatedUser`: the signed-in account, as returned by `/auth/users/me/`
//! - `NewAccount`: registration payload
//! - `Contact`, `ContactUser`, `ContactState`: collaboration requests between users

pub mod contact;
pub mod user;

pub use contact::{Contact, ContactState, ContactUser};
pub use user::{AuthenticatedUser, NewAccount, UserStatus};
