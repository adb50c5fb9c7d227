use access_gateway::{
    CapabilitySnapshot, JwtSessionResolver, ResolveError, Resolution, SessionResolver,
    auth::Claims,
};
use axum::http::{Method, Request, Uri, header, request::Parts};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use std::time::SystemTime;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_SUBJECT: &str = "auth0|test-user";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> String {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &key).unwrap()
}

fn create_token(approved: bool, onboarding_done: bool) -> String {
    let now = now();
    let claims = Claims {
        sub: TEST_SUBJECT.to_string(),
        iat: now as usize,
        exp: (now + 3600) as usize,
        approved,
        onboarding_done,
    };
    sign(&claims, TEST_JWT_SECRET)
}

fn resolver() -> JwtSessionResolver {
    JwtSessionResolver::new(TEST_JWT_SECRET, "session")
}

/// Helper to get the Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_header(name: header::HeaderName, value: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    parts
        .headers
        .append(name, header::HeaderValue::from_str(value).unwrap());
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_bearer_token_resolves_capabilities() {
    let token = create_token(true, false);
    let parts = with_header(header::AUTHORIZATION, &format!("Bearer {}", token));

    let resolution = resolver().resolve(&parts).await.unwrap();

    assert_eq!(
        resolution,
        Resolution::Authenticated(CapabilitySnapshot {
            authenticated: true,
            approved: true,
            onboarding_done: false,
        })
    );
}

#[tokio::test]
async fn test_session_cookie_resolves_capabilities() {
    let token = create_token(true, true);
    let parts = with_header(header::COOKIE, &format!("theme=dark; session={}; lang=he", token));

    let resolution = resolver().resolve(&parts).await.unwrap();

    assert_eq!(
        resolution,
        Resolution::Authenticated(CapabilitySnapshot {
            authenticated: true,
            approved: true,
            onboarding_done: true,
        })
    );
}

#[tokio::test]
async fn test_bearer_header_takes_precedence_over_cookie() {
    let mut parts = with_header(
        header::AUTHORIZATION,
        &format!("Bearer {}", create_token(true, true)),
    );
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!("session={}", create_token(false, false))).unwrap(),
    );

    let resolution = resolver().resolve(&parts).await.unwrap();

    let Resolution::Authenticated(snapshot) = resolution else {
        panic!("expected an authenticated resolution");
    };
    assert!(snapshot.approved);
    assert!(snapshot.onboarding_done);
}

#[tokio::test]
async fn test_missing_credential_is_unauthenticated_not_error() {
    let parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());

    let resolution = resolver().resolve(&parts).await;

    assert!(matches!(resolution, Ok(Resolution::Unauthenticated)));
}

#[tokio::test]
async fn test_unrelated_cookies_are_unauthenticated() {
    let parts = with_header(header::COOKIE, "theme=dark; sessionid=abc");

    let resolution = resolver().resolve(&parts).await;

    assert!(matches!(resolution, Ok(Resolution::Unauthenticated)));
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    // Well past the default validation leeway.
    let now = now();
    let claims = Claims {
        sub: TEST_SUBJECT.to_string(),
        iat: (now - 7200) as usize,
        exp: (now - 3600) as usize,
        approved: true,
        onboarding_done: true,
    };
    let parts = with_header(
        header::AUTHORIZATION,
        &format!("Bearer {}", sign(&claims, TEST_JWT_SECRET)),
    );

    let resolution = resolver().resolve(&parts).await;

    assert!(matches!(resolution, Err(ResolveError::Expired)));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let now = now();
    let claims = Claims {
        sub: TEST_SUBJECT.to_string(),
        iat: now as usize,
        exp: (now + 3600) as usize,
        approved: true,
        onboarding_done: true,
    };
    let parts = with_header(
        header::AUTHORIZATION,
        &format!("Bearer {}", sign(&claims, "some-other-secret")),
    );

    let resolution = resolver().resolve(&parts).await;

    assert!(matches!(resolution, Err(ResolveError::Invalid(_))));
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let parts = with_header(header::COOKIE, "session=not-a-jwt");

    let resolution = resolver().resolve(&parts).await;

    assert!(matches!(resolution, Err(ResolveError::Invalid(_))));
}

#[tokio::test]
async fn test_camel_case_onboarding_claim_is_accepted() {
    let now = now();
    let claims = serde_json::json!({
        "sub": TEST_SUBJECT,
        "iat": now,
        "exp": now + 3600,
        "isOnboardingDone": true,
    });
    let parts = with_header(
        header::AUTHORIZATION,
        &format!("Bearer {}", sign(&claims, TEST_JWT_SECRET)),
    );

    let resolution = resolver().resolve(&parts).await.unwrap();

    assert_eq!(
        resolution,
        Resolution::Authenticated(CapabilitySnapshot {
            authenticated: true,
            approved: false,
            onboarding_done: true,
        })
    );
}
