//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user from a JWT access token.

pub mod auth;
