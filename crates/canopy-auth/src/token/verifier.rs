//! Bearer token verification against the provider key store.
//!
//! Verification is pure computation over the immutable [`KeyStore`]; it never
//! performs I/O and has no side effects.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde_json::Value;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::federation::KeyStore;
use crate::middleware::AuthContext;

use super::claims::Claims;
use super::roles::RoleSet;

/// Validates bearer tokens issued by the configured provider.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key_store: Arc<KeyStore>,
    client_id: Option<String>,
    leeway: Duration,
}

impl TokenVerifier {
    /// Creates a verifier over an initialized key store.
    ///
    /// Audience checking is enabled exactly when `config` carries a client id.
    #[must_use]
    pub fn new(key_store: Arc<KeyStore>, config: &AuthConfig) -> Self {
        Self {
            key_store,
            client_id: config.client_id().map(str::to_string),
            leeway: config.leeway,
        }
    }

    /// The key store tokens are checked against.
    #[must_use]
    pub fn key_store(&self) -> &KeyStore {
        &self.key_store
    }

    /// Verifies the `Authorization` header value and checks required roles.
    ///
    /// Checks run in a fixed order and the first failure wins: credential
    /// shape, token header, key lookup, signature, `exp`/`nbf`, `iss`, `aud`
    /// (only with a client id), then each required role in order.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] variant for the first failed check.
    pub fn verify(
        &self,
        authorization: Option<&str>,
        required_roles: &[String],
    ) -> Result<AuthContext, AuthError> {
        let token = bearer_token(authorization).ok_or(AuthError::MissingCredential)?;

        let header = decode_header(token).map_err(|e| AuthError::malformed(e.to_string()))?;

        let kid = header.kid.as_deref().unwrap_or_default();
        let key = self
            .key_store
            .lookup_key(kid)
            .ok_or_else(|| AuthError::unknown_key(kid))?;

        if is_symmetric(header.alg) {
            return Err(AuthError::InvalidSignature);
        }
        if let Some(declared) = key.algorithm
            && declared != header.alg
        {
            return Err(AuthError::InvalidSignature);
        }

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway.as_secs();
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[self.key_store.issuer()]);
        // A missing `iss` is reported as InvalidIssuer below, not as malformed.
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &key.decoding_key, &validation)?.claims;

        if claims.iss() != Some(self.key_store.issuer()) {
            return Err(AuthError::InvalidIssuer);
        }

        if let Some(client_id) = self.client_id.as_deref()
            && !audience_contains(claims.get("aud"), client_id)
        {
            return Err(AuthError::InvalidAudience);
        }

        let roles = RoleSet::from_claims(&claims, self.client_id.as_deref());
        if let Some(role) = roles.first_missing(required_roles) {
            return Err(AuthError::missing_role(role));
        }

        Ok(AuthContext::new(claims, roles))
    }
}

/// Extracts the token from `Bearer <token>`, matching the scheme
/// case-insensitively.
fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization?.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn is_symmetric(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// `aud` may be a single string or an array of strings.
fn audience_contains(aud: Option<&Value>, client_id: &str) -> bool {
    match aud {
        Some(Value::String(aud)) => aud == client_id,
        Some(Value::Array(values)) => values.iter().any(|v| v.as_str() == Some(client_id)),
        _ => false,
    }
}
