//! Gateway functionality: authentication for the application and admin routes.
//!
//! - Bearer JWT validation and identity stamping ([`auth`])
//! - HTTP basic auth for documentation and platform routes ([`basic_auth`])

pub mod auth;
pub mod basic_auth;

pub use auth::{AuthService, JwtAuth};
