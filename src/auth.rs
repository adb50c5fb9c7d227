use async_trait::async_trait;
use axum::http::{header, request::Parts};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::ResolveError,
    session::{CapabilitySnapshot, Resolution, SessionResolver},
};

/// Claims
///
/// The payload of a session token issued by the identity provider.
/// Only the capability flags are consumed by the gateway; `sub` is carried
/// through for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the provider's user identifier (e.g. `auth0|abc123`).
    pub sub: String,
    /// Expiration time. Validation rejects tokens past this instant.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
    /// Whether an administrator has approved the account.
    #[serde(default)]
    pub approved: bool,
    /// Whether the user finished the onboarding flow.
    #[serde(default, alias = "isOnboardingDone")]
    pub onboarding_done: bool,
}

impl From<&Claims> for CapabilitySnapshot {
    fn from(claims: &Claims) -> Self {
        CapabilitySnapshot {
            authenticated: true,
            approved: claims.approved,
            onboarding_done: claims.onboarding_done,
        }
    }
}

/// JwtSessionResolver
///
/// Resolves a request from an HS256-signed session token.
///
/// Credential lookup order:
/// 1. `Authorization: Bearer <token>`
/// 2. The session cookie (name from `SESSION_COOKIE_NAME`)
///
/// A request carrying neither is `Unauthenticated`. A token that is present
/// but fails verification is a `ResolveError`.
pub struct JwtSessionResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl JwtSessionResolver {
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        let mut validation = Validation::default();
        // Ensure expiration time validation is always active.
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.session_cookie.clone())
    }

    /// Verifies `token` and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, ResolveError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Pulls the raw token out of the request, bearer header first.
    fn credential<'a>(&self, parts: &'a Parts) -> Option<&'a str> {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        bearer.or_else(|| self.cookie(parts))
    }

    fn cookie<'a>(&self, parts: &'a Parts) -> Option<&'a str> {
        parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, parts: &Parts) -> Result<Resolution, ResolveError> {
        let Some(token) = self.credential(parts) else {
            return Ok(Resolution::Unauthenticated);
        };

        let claims = self.verify(token)?;
        tracing::debug!(sub = %claims.sub, "session token verified");

        Ok(Resolution::Authenticated(CapabilitySnapshot::from(&claims)))
    }
}
