//! Role extraction from token claims.
//!
//! Providers spread authorization attributes across several claims. The role
//! set is the union of:
//!
//! | Claim | Shape |
//! |-------|-------|
//! | `roles` | array of strings |
//! | `scope` | space-delimited string |
//! | `scp` | array of strings or space-delimited string |
//! | `groups` | array of strings |
//! | `resource_access.<client_id>.roles` | array of strings, only with a client id |
//!
//! Values of any other shape are ignored, as are non-string array elements.

use std::collections::BTreeSet;

use serde_json::Value;

use super::claims::Claims;

/// The set of role and permission strings granted by a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Builds the role set from verified claims.
    #[must_use]
    pub fn from_claims(claims: &Claims, client_id: Option<&str>) -> Self {
        let mut roles = BTreeSet::new();

        if let Some(Value::Array(values)) = claims.get("roles") {
            extend_strings(&mut roles, values);
        }

        if let Some(Value::String(scope)) = claims.get("scope") {
            extend_delimited(&mut roles, scope);
        }

        match claims.get("scp") {
            Some(Value::Array(values)) => extend_strings(&mut roles, values),
            Some(Value::String(scp)) => extend_delimited(&mut roles, scp),
            _ => {}
        }

        if let Some(Value::Array(values)) = claims.get("groups") {
            extend_strings(&mut roles, values);
        }

        if let Some(client_id) = client_id
            && let Some(Value::Array(values)) = claims
                .get("resource_access")
                .and_then(|access| access.get(client_id))
                .and_then(|client| client.get("roles"))
        {
            extend_strings(&mut roles, values);
        }

        Self(roles)
    }

    /// Returns `true` if the role is granted.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// Returns the first role in `required` that is not granted.
    #[must_use]
    pub fn first_missing<'a>(&self, required: &'a [String]) -> Option<&'a str> {
        required
            .iter()
            .map(String::as_str)
            .find(|role| !self.contains(role))
    }

    /// Iterates over the granted roles in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of granted roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no role is granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

fn extend_strings(roles: &mut BTreeSet<String>, values: &[Value]) {
    roles.extend(values.iter().filter_map(Value::as_str).map(str::to_string));
}

fn extend_delimited(roles: &mut BTreeSet<String>, value: &str) {
    roles.extend(value.split_whitespace().map(str::to_string));
}
