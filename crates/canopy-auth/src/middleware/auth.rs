//! Bearer token authentication extractor and role guard.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::AuthError;
use crate::token::TokenVerifier;

use super::types::AuthContext;

// =============================================================================
// Auth State
// =============================================================================

/// State required for bearer token authentication.
///
/// Include it in the application state and expose it to [`BearerAuth`] via
/// `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Verifier shared across requests.
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    fn verify(&self, parts: &Parts, required_roles: &[String]) -> Result<AuthContext, AuthError> {
        // A header that is not valid UTF-8 is treated like a missing one.
        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        self.verifier.verify(authorization, required_roles)
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor yielding the verified [`AuthContext`].
///
/// Reuses the context already placed in request extensions by
/// [`require_roles`]; otherwise verifies the `Authorization` header without
/// role requirements.
///
/// # Example
///
/// ```ignore
/// async fn handler(BearerAuth(auth): BearerAuth) -> impl IntoResponse {
///     format!("Hello, {}!", auth.subject())
/// }
/// ```
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<AuthContext>() {
            return Ok(BearerAuth(ctx.clone()));
        }

        let auth_state = AuthState::from_ref(state);
        auth_state.verify(parts, &[]).map(BearerAuth)
    }
}

// =============================================================================
// Role Guard
// =============================================================================

/// Per-route authorization requirement, used as the state of
/// [`require_roles`].
#[derive(Clone)]
pub struct RoleGuard {
    state: AuthState,
    roles: Arc<[String]>,
}

impl RoleGuard {
    /// Creates a guard requiring every role in `roles`. An empty list admits
    /// any valid token.
    pub fn new(state: AuthState, roles: Vec<String>) -> Self {
        Self {
            state,
            roles: roles.into(),
        }
    }

    /// Roles this guard requires.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}

/// Middleware rejecting requests whose bearer token is invalid or lacks the
/// guard's roles.
///
/// On success the [`AuthContext`] is inserted into request extensions.
///
/// # Errors
///
/// Returns the [`AuthError`] from verification, rendered as `401`.
pub async fn require_roles(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();

    let ctx = guard.state.verify(&parts, &guard.roles)?;

    tracing::debug!(
        subject = %ctx.subject(),
        roles = ctx.roles.len(),
        "Token validated successfully"
    );

    parts.extensions.insert(ctx);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
