//! Error response handling for authentication middleware.
//!
//! Every [`AuthError`] becomes `401 Unauthorized` with a `{"detail": ...}`
//! body and an RFC 6750 `WWW-Authenticate` challenge. The body carries only
//! the coarse client message; the precise kind goes to the debug log.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(kind = self.kind(), error = %self, "Rejected bearer token");

        let message = self.client_message();
        let oauth_error = match self {
            AuthError::MissingCredential => None,
            AuthError::MissingRole { .. } => Some("insufficient_scope"),
            _ => Some("invalid_token"),
        };

        let mut response = (StatusCode::UNAUTHORIZED, Json(detail_json(&message))).into_response();

        let www_auth = build_www_authenticate_header(oauth_error, &message);
        if let Ok(value) = HeaderValue::from_str(&www_auth) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }

        response
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="canopy", error="invalid_token", error_description="..."`.
/// A request without credentials gets the bare challenge (RFC 6750 section 3.1).
fn build_www_authenticate_header(error: Option<&str>, description: &str) -> String {
    match error {
        Some(error) => {
            let escaped_desc = description.replace('\"', "\\\"");
            format!(
                "Bearer realm=\"canopy\", error=\"{}\", error_description=\"{}\"",
                error, escaped_desc
            )
        }
        None => "Bearer realm=\"canopy\"".to_string(),
    }
}

/// Creates the `{"detail": ...}` error body shared by every error response.
#[must_use]
pub fn detail_json(message: &str) -> serde_json::Value {
    json!({ "detail": message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn www_authenticate(response: &Response) -> String {
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_missing_credential_response() {
        let response = AuthError::MissingCredential.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(www_authenticate(&response), "Bearer realm=\"canopy\"");
        assert_eq!(
            body_json(response).await,
            json!({ "detail": "Authorization header missing" })
        );
    }

    #[tokio::test]
    async fn test_expired_token_response() {
        let response = AuthError::ExpiredToken.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = www_authenticate(&response);
        assert!(www_auth.contains("error=\"invalid_token\""));
        assert!(www_auth.contains("error_description=\"Token expired\""));
        assert_eq!(body_json(response).await, json!({ "detail": "Token expired" }));
    }

    #[tokio::test]
    async fn test_missing_role_response() {
        let response = AuthError::missing_role("admin").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(www_authenticate(&response).contains("error=\"insufficient_scope\""));
        assert_eq!(
            body_json(response).await,
            json!({ "detail": "Role [admin] is required." })
        );
    }

    #[tokio::test]
    async fn test_unknown_key_hides_kind() {
        let response = AuthError::unknown_key("rotated-key").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({ "detail": "Invalid token" }));
    }

    #[test]
    fn test_www_authenticate_escapes_quotes() {
        let header = build_www_authenticate_header(Some("invalid_token"), "bad \"token\"");
        assert!(header.contains("error_description=\"bad \\\"token\\\"\""));
    }
}
