//! Content fingerprints and `If-None-Match` handling.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `payload`.
pub fn fingerprint(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Outcome of comparing a fingerprint with the client's cached validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional {
    NotModified { etag: String },
    Modified { etag: String },
}

/// Compares `If-None-Match` against `"<fp>"` and its weak form `W/"<fp>"`.
///
/// Only an exact single-validator match counts; lists and `*` are treated as
/// a miss.
pub fn evaluate(fingerprint: &str, if_none_match: Option<&str>) -> Conditional {
    let etag = format!("\"{fingerprint}\"");
    let matched = if_none_match
        .map(str::trim)
        .is_some_and(|value| value == etag || value.strip_prefix("W/") == Some(etag.as_str()));

    if matched {
        Conditional::NotModified { etag }
    } else {
        Conditional::Modified { etag }
    }
}

impl Conditional {
    pub fn etag(&self) -> &str {
        match self {
            Self::NotModified { etag } | Self::Modified { etag } => etag,
        }
    }

    /// `304` with no body, or `200` carrying the JSON `body`. Both set `ETag`.
    pub fn into_response(self, body: Vec<u8>) -> Response {
        let etag = HeaderValue::from_str(self.etag())
            .unwrap_or_else(|_| HeaderValue::from_static("\"invalid\""));

        match self {
            Self::NotModified { .. } => {
                (StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response()
            }
            Self::Modified { .. } => (
                StatusCode::OK,
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    ),
                    (header::ETAG, etag),
                ],
                Body::from(body),
            )
                .into_response(),
        }
    }
}
