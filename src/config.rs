use std::env;

use crate::{
    error::ConfigError,
    policy::{PolicySpec, default_policies},
};

/// Local fallback for the session secret. Never accepted in production.
const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// Auth.js session cookie names; the `__Secure-` form is used behind https.
const SESSION_COOKIE: &str = "authjs.session-token";
const SECURE_SESSION_COOKIE: &str = "__Secure-authjs.session-token";

/// AppConfig
///
/// The gateway's configuration, read from the environment once at startup and
/// then shared immutably. The decision engine is built from it; nothing reads
/// the environment after `load()` returns.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and secret fallbacks.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the application that allowed requests are forwarded to.
    pub upstream_url: String,
    // Secret used to verify session tokens.
    pub jwt_secret: String,
    // Name of the cookie that carries the session token.
    pub session_cookie: String,
    // Exact path answered with a plain `200 OK`, ahead of every other rule.
    pub health_check_path: String,
    // Literal prefixes that bypass the policy table.
    pub public_paths: Vec<String>,
    // Ordered route policies; first applicable entry wins.
    pub route_policies: Vec<PolicySpec>,
    // Fixed target for callers that are not yet approved.
    pub approval_redirect: String,
    // Fixed target for callers that have not finished onboarding.
    pub onboarding_redirect: String,
    // Where onboarded callers asking for the onboarding page are sent. `None` disables it.
    pub onboarded_redirect: Option<String>,
}

/// Env
///
/// The runtime context: human-readable logs and a dev secret fallback locally,
/// JSON logs and mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

pub fn default_public_paths() -> Vec<String> {
    [
        "/",
        "/login",
        "/api/auth",
        "/_next/static",
        "/_next/image",
        "/favicon.ico",
        "/sitemap.xml",
        "/robots.txt",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AppConfig {
    /// Local-mode configuration with the built-in policy table. Used by tests
    /// and as the base that environment variables override.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "0.0.0.0:3000".to_string(),
            upstream_url: "http://localhost:3001".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_cookie: SESSION_COOKIE.to_string(),
            health_check_path: "/health".to_string(),
            public_paths: default_public_paths(),
            route_policies: default_policies(),
            approval_redirect: "/pending-approval".to_string(),
            onboarding_redirect: "/onboarding".to_string(),
            onboarded_redirect: Some("/dashboard".to_string()),
        }
    }
}

/// Parses a comma-separated list, dropping blank entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

fn var_or(name: &str, fallback: String) -> String {
    env::var(name).unwrap_or(fallback)
}

/// The cookie Auth.js would set for an app served from `auth_url`.
fn session_cookie_for(auth_url: Option<&str>) -> &'static str {
    match auth_url {
        Some(url) if url.starts_with("https://") => SECURE_SESSION_COOKIE,
        _ => SESSION_COOKIE,
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every recognised variable, falling back to `AppConfig::default()`
    /// for anything unset.
    ///
    /// The session cookie name follows `AUTH_URL` (the `__Secure-` variant for
    /// https) unless `SESSION_COOKIE_NAME` names one explicitly. An empty
    /// `ONBOARDED_REDIRECT_PATH` turns the onboarded-user redirect off.
    ///
    /// # Errors
    /// `SESSION_JWT_SECRET` is mandatory when `APP_ENV=production`, and
    /// `ROUTE_POLICIES` must parse as a JSON policy list when present.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => env::var("SESSION_JWT_SECRET")
                .map_err(|_| ConfigError::Missing("SESSION_JWT_SECRET"))?,
            Env::Local => var_or("SESSION_JWT_SECRET", defaults.jwt_secret),
        };

        let public_paths = match env::var("PUBLIC_PATHS") {
            Ok(raw) => parse_list(&raw),
            Err(_) => defaults.public_paths,
        };

        let route_policies = match env::var("ROUTE_POLICIES") {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(_) => defaults.route_policies,
        };

        let session_cookie = match env::var("SESSION_COOKIE_NAME") {
            Ok(name) => name,
            Err(_) => session_cookie_for(env::var("AUTH_URL").ok().as_deref()).to_string(),
        };

        let onboarded_redirect = match env::var("ONBOARDED_REDIRECT_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(path),
            Err(_) => defaults.onboarded_redirect,
        };

        Ok(Self {
            env,
            bind_addr: var_or("BIND_ADDR", defaults.bind_addr),
            upstream_url: var_or("UPSTREAM_URL", defaults.upstream_url),
            jwt_secret,
            session_cookie,
            health_check_path: var_or("HEALTH_CHECK_PATH", defaults.health_check_path),
            public_paths,
            route_policies,
            approval_redirect: var_or("APPROVAL_REDIRECT_PATH", defaults.approval_redirect),
            onboarding_redirect: var_or("ONBOARDING_REDIRECT_PATH", defaults.onboarding_redirect),
            onboarded_redirect,
        })
    }
}
