//! Token verification with real RS256 signatures.

use std::sync::Arc;

use canopy_auth::federation::{KeySet, KeyStore, ProviderConfiguration};
use canopy_auth::{AuthConfig, AuthError, TokenVerifier};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use url::Url;

const ISSUER: &str = "https://auth.example.com/realms/canopy";
const CLIENT_ID: &str = "canopy-web";

fn key_store() -> Arc<KeyStore> {
    let issuer_url = Url::parse(ISSUER).unwrap();
    let provider = ProviderConfiguration {
        discovery_url: Url::parse(&format!("{ISSUER}/.well-known/openid-configuration")).unwrap(),
        jwks_uri: Url::parse(&format!("{ISSUER}/protocol/openid-connect/certs")).unwrap(),
        issuer: ISSUER.to_string(),
        issuer_url,
    };
    let keys = KeySet::from_json(include_bytes!("fixtures/jwks.json")).unwrap();
    Arc::new(KeyStore::from_parts(provider, keys))
}

fn verifier(config: AuthConfig) -> TokenVerifier {
    TokenVerifier::new(key_store(), &config)
}

fn default_verifier() -> TokenVerifier {
    verifier(AuthConfig::new(ISSUER))
}

fn audience_verifier() -> TokenVerifier {
    verifier(AuthConfig::new(ISSUER).with_client_id(CLIENT_ID))
}

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

fn claims(extra: Value) -> Value {
    let mut claims = json!({
        "sub": "user-1",
        "iss": ISSUER,
        "exp": now() + 300,
        "iat": now(),
    });
    for (k, v) in extra.as_object().unwrap() {
        claims[k] = v.clone();
    }
    claims
}

fn sign_with(pem: &[u8], kid: Option<&str>, alg: Algorithm, claims: &Value) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
}

fn sign(claims: &Value) -> String {
    sign_with(
        include_bytes!("fixtures/signing-key-1.pem"),
        Some("signing-key-1"),
        Algorithm::RS256,
        claims,
    )
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn roles(required: &[&str]) -> Vec<String> {
    required.iter().map(|r| r.to_string()).collect()
}

// =============================================================================
// Credential shape
// =============================================================================

#[test]
fn test_missing_header() {
    let err = default_verifier().verify(None, &[]).unwrap_err();
    assert_eq!(err, AuthError::MissingCredential);
    assert_eq!(err.client_message(), "Authorization header missing");
}

#[test]
fn test_non_bearer_scheme() {
    let verifier = default_verifier();
    for header in ["", "Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "token"] {
        assert_eq!(
            verifier.verify(Some(header), &[]).unwrap_err(),
            AuthError::MissingCredential,
            "{header:?}"
        );
    }
}

#[test]
fn test_scheme_is_case_insensitive() {
    let token = sign(&claims(json!({})));
    assert!(
        default_verifier()
            .verify(Some(&format!("bearer {token}")), &[])
            .is_ok()
    );
}

#[test]
fn test_garbage_token_is_malformed() {
    let err = default_verifier()
        .verify(Some("Bearer not.a.jwt"), &[])
        .unwrap_err();
    assert!(matches!(err, AuthError::MalformedToken { .. }));
    assert_eq!(err.client_message(), "Invalid token");
}

// =============================================================================
// Keys and signatures
// =============================================================================

#[test]
fn test_valid_token_yields_all_claims() {
    let token = sign(&claims(json!({ "tenant": "north", "scope": "read" })));

    let ctx = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap();

    assert_eq!(ctx.subject(), "user-1");
    assert_eq!(ctx.claims.iss(), Some(ISSUER));
    assert_eq!(ctx.claims.get_str("tenant"), Some("north"));
    assert!(ctx.has_role("read"));
}

#[test]
fn test_unknown_kid_fails() {
    let token = sign_with(
        include_bytes!("fixtures/signing-key-2.pem"),
        Some("signing-key-2"),
        Algorithm::RS256,
        &claims(json!({})),
    );

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::unknown_key("signing-key-2"));
    assert_eq!(err.client_message(), "Invalid token");
}

#[test]
fn test_missing_kid_fails() {
    let token = sign_with(
        include_bytes!("fixtures/signing-key-1.pem"),
        None,
        Algorithm::RS256,
        &claims(json!({})),
    );

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::unknown_key(""));
}

#[test]
fn test_signature_from_other_key_fails() {
    let token = sign_with(
        include_bytes!("fixtures/signing-key-2.pem"),
        Some("signing-key-1"),
        Algorithm::RS256,
        &claims(json!({})),
    );

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);
}

#[test]
fn test_tampered_payload_fails() {
    let token = sign(&claims(json!({ "scope": "read" })));
    let forged = sign(&claims(json!({ "scope": "admin" })));

    let mut parts: Vec<&str> = token.split('.').collect();
    parts[1] = forged.split('.').nth(1).unwrap();
    let tampered = parts.join(".");

    let err = default_verifier()
        .verify(Some(&bearer(&tampered)), &[])
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);
}

#[test]
fn test_algorithm_must_match_declared_key_alg() {
    let token = sign_with(
        include_bytes!("fixtures/signing-key-1.pem"),
        Some("signing-key-1"),
        Algorithm::RS384,
        &claims(json!({})),
    );

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);
}

#[test]
fn test_symmetric_algorithm_rejected() {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("signing-key-1".to_string());
    let token = encode(
        &header,
        &claims(json!({})),
        &EncodingKey::from_secret(b"shared-secret"),
    )
    .unwrap();

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::InvalidSignature);
}

// =============================================================================
// Time claims
// =============================================================================

#[test]
fn test_expired_token() {
    let token = sign(&claims(json!({ "exp": now() - 60 })));

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::ExpiredToken);
    assert_eq!(err.client_message(), "Token expired");
}

#[test]
fn test_expiry_wins_over_bad_issuer() {
    let token = sign(&claims(json!({ "exp": now() - 60, "iss": "https://evil.example.com" })));

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::ExpiredToken);
}

#[test]
fn test_leeway_tolerates_small_skew() {
    let mut config = AuthConfig::new(ISSUER);
    config.leeway = std::time::Duration::from_secs(120);
    let token = sign(&claims(json!({ "exp": now() - 30 })));

    assert!(verifier(config).verify(Some(&bearer(&token)), &[]).is_ok());
}

#[test]
fn test_missing_exp_is_malformed() {
    let mut claims = claims(json!({}));
    claims.as_object_mut().unwrap().remove("exp");
    let token = sign(&claims);

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert!(matches!(err, AuthError::MalformedToken { .. }));
}

#[test]
fn test_not_yet_valid() {
    let token = sign(&claims(json!({ "nbf": now() + 600 })));

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::NotYetValid);
}

// =============================================================================
// Issuer and audience
// =============================================================================

#[test]
fn test_wrong_issuer() {
    let token = sign(&claims(json!({ "iss": "https://evil.example.com" })));

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::InvalidIssuer);
}

#[test]
fn test_missing_issuer() {
    let mut claims = claims(json!({}));
    claims.as_object_mut().unwrap().remove("iss");
    let token = sign(&claims);

    let err = default_verifier().verify(Some(&bearer(&token)), &[]).unwrap_err();
    assert_eq!(err, AuthError::InvalidIssuer);
}

#[test]
fn test_audience_ignored_without_client_id() {
    let token = sign(&claims(json!({ "aud": "someone-else" })));
    assert!(default_verifier().verify(Some(&bearer(&token)), &[]).is_ok());
}

#[test]
fn test_audience_checked_with_client_id() {
    let verifier = audience_verifier();

    let token = sign(&claims(json!({ "aud": CLIENT_ID })));
    assert!(verifier.verify(Some(&bearer(&token)), &[]).is_ok());

    let token = sign(&claims(json!({ "aud": ["account", CLIENT_ID] })));
    assert!(verifier.verify(Some(&bearer(&token)), &[]).is_ok());

    let token = sign(&claims(json!({ "aud": "account" })));
    assert_eq!(
        verifier.verify(Some(&bearer(&token)), &[]).unwrap_err(),
        AuthError::InvalidAudience
    );

    let token = sign(&claims(json!({})));
    assert_eq!(
        verifier.verify(Some(&bearer(&token)), &[]).unwrap_err(),
        AuthError::InvalidAudience
    );
}

// =============================================================================
// Roles
// =============================================================================

#[test]
fn test_scope_grants_role() {
    let verifier = default_verifier();

    let token = sign(&claims(json!({ "scope": "read admin write" })));
    assert!(verifier.verify(Some(&bearer(&token)), &roles(&["admin"])).is_ok());

    let token = sign(&claims(json!({ "scope": "read write" })));
    let err = verifier
        .verify(Some(&bearer(&token)), &roles(&["admin"]))
        .unwrap_err();
    assert_eq!(err, AuthError::missing_role("admin"));
    assert_eq!(err.client_message(), "Role [admin] is required.");
}

#[test]
fn test_roles_and_groups_union() {
    let verifier = default_verifier();
    let token = sign(&claims(json!({ "roles": ["a"], "groups": ["b"] })));

    assert!(verifier.verify(Some(&bearer(&token)), &roles(&["a"])).is_ok());
    assert!(verifier.verify(Some(&bearer(&token)), &roles(&["b"])).is_ok());
    assert!(verifier.verify(Some(&bearer(&token)), &roles(&["a", "b"])).is_ok());
}

#[test]
fn test_first_missing_role_is_reported() {
    let token = sign(&claims(json!({ "roles": ["b"] })));

    let err = default_verifier()
        .verify(Some(&bearer(&token)), &roles(&["a", "b", "c"]))
        .unwrap_err();
    assert_eq!(err, AuthError::missing_role("a"));
}

#[test]
fn test_client_roles_from_resource_access() {
    let token = sign(&claims(json!({
        "aud": CLIENT_ID,
        "resource_access": { CLIENT_ID: { "roles": ["viewer"] } }
    })));

    let ctx = audience_verifier()
        .verify(Some(&bearer(&token)), &roles(&["viewer"]))
        .unwrap();
    assert!(ctx.has_role("viewer"));
}

#[test]
fn test_verification_is_repeatable() {
    let verifier = default_verifier();
    let token = sign(&claims(json!({})));

    for _ in 0..3 {
        assert!(verifier.verify(Some(&bearer(&token)), &[]).is_ok());
    }
    assert_eq!(verifier.key_store().keys().len(), 1);
}
