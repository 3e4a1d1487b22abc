//! Authentication context types.

use std::sync::Arc;

use crate::token::{Claims, RoleSet};

/// Authenticated request context.
///
/// Produced by a successful verification and inserted into request
/// extensions by [`require_roles`](super::require_roles). Claims are wrapped in
/// `Arc` so the context clones cheaply.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// All claims of the verified token.
    pub claims: Arc<Claims>,

    /// Roles derived from the claims.
    pub roles: Arc<RoleSet>,
}

impl AuthContext {
    /// Creates a context from verified claims and their role set.
    #[must_use]
    pub fn new(claims: Claims, roles: RoleSet) -> Self {
        Self {
            claims: Arc::new(claims),
            roles: Arc::new(roles),
        }
    }

    /// Token subject, or an empty string when absent.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.claims.sub().unwrap_or_default()
    }

    /// Returns `true` if the token grants `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
