//! HTTP middleware for authentication and authorization.
//!
//! This module provides Axum glue around the [`TokenVerifier`]:
//!
//! - [`BearerAuth`] extractor for handlers that need the verified context
//! - [`RoleGuard`] / [`require_roles`] middleware for per-route role checks
//! - `IntoResponse` for [`AuthError`] producing `401` with `WWW-Authenticate`
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn_with_state, routing::get};
//! use canopy_auth::middleware::{AuthState, RoleGuard, require_roles};
//!
//! let guard = RoleGuard::new(auth_state.clone(), vec!["viewer".to_string()]);
//! let app = Router::new().route(
//!     "/layers",
//!     get(handler).route_layer(from_fn_with_state(guard, require_roles)),
//! );
//! ```
//!
//! [`TokenVerifier`]: crate::token::TokenVerifier
//! [`AuthError`]: crate::error::AuthError

pub mod auth;
pub mod error;
pub mod types;

pub use auth::{AuthState, BearerAuth, RoleGuard, require_roles};
pub use error::detail_json;
pub use types::AuthContext;
