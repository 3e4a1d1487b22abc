//! # canopy-auth
//!
//! Bearer-token authorization for the Canopy gateway.
//!
//! This crate provides:
//! - OIDC discovery and signing-key resolution for a single trusted provider
//! - Signature and standard-claim validation of bearer tokens
//! - Role extraction from provider-specific claims
//! - Axum extractors and middleware for protected routes
//!
//! ## Overview
//!
//! At startup [`KeyStore::initialize`] performs discovery and fetches the
//! provider's key set once. The resulting store is immutable; every request is
//! then checked by a [`TokenVerifier`] without further I/O.
//!
//! ## Modules
//!
//! - [`config`] - Provider and per-route role configuration
//! - [`federation`] - Discovery, JWKS fetching and the key store
//! - [`token`] - Claims, roles and verification
//! - [`middleware`] - HTTP middleware for authentication/authorization
//! - [`error`] - The verification error enum

pub mod config;
pub mod error;
pub mod federation;
pub mod middleware;
pub mod token;

pub use config::{AuthConfig, ConfigError, RouteRoles};
pub use error::AuthError;
pub use federation::{KeyStore, KeyStoreError};
pub use middleware::{AuthContext, AuthState, BearerAuth, RoleGuard, require_roles};
pub use token::{Claims, RoleSet, TokenVerifier};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;
