//! Bearer token verification.
//!
//! - [`claims`] - The decoded claim set
//! - [`roles`] - Role extraction from claims
//! - [`verifier`] - Signature and claim validation against the [`KeyStore`]
//!
//! [`KeyStore`]: crate::federation::KeyStore

pub mod claims;
pub mod roles;
pub mod verifier;

pub use claims::Claims;
pub use roles::RoleSet;
pub use verifier::TokenVerifier;
