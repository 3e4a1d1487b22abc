//! Authentication and authorization error types.
//!
//! Every way a presented credential can be rejected is a distinct variant, so
//! callers branch on the kind instead of inspecting messages.

/// Reasons a request fails bearer-token verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header, or one not of the form `Bearer <token>`.
    #[error("Missing credential")]
    MissingCredential,

    /// The token could not be decoded or lacks a required claim.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of the decoding failure.
        message: String,
    },

    /// The token names a key that is not in the provider's key set.
    #[error("Unknown signing key: {kid}")]
    UnknownKey {
        /// The `kid` from the token header, empty when absent.
        kid: String,
    },

    /// The signature does not verify, or the header algorithm does not fit
    /// the resolved key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The `exp` claim is in the past.
    #[error("Token expired")]
    ExpiredToken,

    /// The `nbf` claim is in the future.
    #[error("Token not yet valid")]
    NotYetValid,

    /// The `iss` claim does not match the provider's issuer.
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// The `aud` claim does not name this deployment's client.
    #[error("Invalid audience")]
    InvalidAudience,

    /// The token is valid but lacks a role the route requires.
    #[error("Missing role: {role}")]
    MissingRole {
        /// The first required role not granted by the token.
        role: String,
    },
}

impl AuthError {
    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownKey` error.
    #[must_use]
    pub fn unknown_key(kid: impl Into<String>) -> Self {
        Self::UnknownKey { kid: kid.into() }
    }

    /// Creates a new `MissingRole` error.
    #[must_use]
    pub fn missing_role(role: impl Into<String>) -> Self {
        Self::MissingRole { role: role.into() }
    }

    /// Short machine-readable name of the failure kind, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedToken { .. } => "malformed_token",
            Self::UnknownKey { .. } => "unknown_key",
            Self::InvalidSignature => "invalid_signature",
            Self::ExpiredToken => "expired_token",
            Self::NotYetValid => "not_yet_valid",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::MissingRole { .. } => "missing_role",
        }
    }

    /// Message shown to the client.
    ///
    /// Only the missing header, expiry, and missing role are told apart;
    /// every other rejection reads "Invalid token".
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingCredential => "Authorization header missing".to_string(),
            Self::ExpiredToken => "Token expired".to_string(),
            Self::MissingRole { role } => format!("Role [{}] is required.", role),
            _ => "Invalid token".to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::ExpiredToken,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidKeyFormat => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::{Error, ErrorKind};

    #[test]
    fn test_client_messages_are_coarse() {
        assert_eq!(
            AuthError::MissingCredential.client_message(),
            "Authorization header missing"
        );
        assert_eq!(AuthError::ExpiredToken.client_message(), "Token expired");
        assert_eq!(
            AuthError::missing_role("admin").client_message(),
            "Role [admin] is required."
        );

        for err in [
            AuthError::malformed("bad base64"),
            AuthError::unknown_key("k1"),
            AuthError::InvalidSignature,
            AuthError::NotYetValid,
            AuthError::InvalidIssuer,
            AuthError::InvalidAudience,
        ] {
            assert_eq!(err.client_message(), "Invalid token", "{err:?}");
        }
    }

    #[test]
    fn test_unknown_key_and_bad_signature_look_identical() {
        assert_eq!(
            AuthError::unknown_key("k1").client_message(),
            AuthError::InvalidSignature.client_message()
        );
    }

    #[test]
    fn test_from_jsonwebtoken_error() {
        let cases = [
            (ErrorKind::ExpiredSignature, AuthError::ExpiredToken),
            (ErrorKind::ImmatureSignature, AuthError::NotYetValid),
            (ErrorKind::InvalidIssuer, AuthError::InvalidIssuer),
            (ErrorKind::InvalidAudience, AuthError::InvalidAudience),
            (ErrorKind::InvalidSignature, AuthError::InvalidSignature),
            (ErrorKind::InvalidAlgorithm, AuthError::InvalidSignature),
        ];

        for (kind, expected) in cases {
            assert_eq!(AuthError::from(Error::from(kind)), expected);
        }

        let err = AuthError::from(Error::from(ErrorKind::InvalidToken));
        assert!(matches!(err, AuthError::MalformedToken { .. }));

        let err = AuthError::from(Error::from(ErrorKind::MissingRequiredClaim(
            "exp".to_string(),
        )));
        assert!(matches!(err, AuthError::MalformedToken { .. }));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(AuthError::ExpiredToken.kind(), "expired_token");
        assert_eq!(AuthError::missing_role("x").kind(), "missing_role");
    }
}
