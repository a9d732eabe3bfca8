//! # atelier-auth
//!
//! Credential primitives for the Atelier collab-manager API:
//!
//! - **Tokens**: HS256 access tokens carrying `{sub, iat, exp}` and nothing
//!   else; roles are always re-read from the database, never trusted from
//!   the token
//! - **Passwords**: salted, iterated SHA-256 hashing with constant-time
//!   verification
//!
//! This crate does no I/O. The HTTP layer decides how each failure maps to a
//! status code; error display strings are the caller-facing detail text.

#![deny(unsafe_code)]

pub mod errors;
pub mod passwords;
pub mod tokens;

pub use errors::{AuthError, Result};
pub use passwords::{hash_password, verify_password};
pub use tokens::{Claims, mint_token, verify_token};
