use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// ConfigError
///
/// Raised while the gateway configuration is being loaded or compiled.
/// Every variant is a startup-time condition: once a `Gateway` exists, its
/// policy table is known to be well formed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable that the current environment requires was not set.
    #[error("{0} must be set")]
    Missing(&'static str),

    /// `ROUTE_POLICIES` was not a valid JSON policy list.
    #[error("ROUTE_POLICIES is not a valid policy list: {0}")]
    PolicyFormat(#[from] serde_json::Error),

    /// A policy pattern or exclusion pattern failed to compile.
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Redirect targets and configured paths must be absolute (`/...`).
    #[error("`{0}` is not an absolute path")]
    RelativePath(String),

    /// A redirect target is itself guarded by the gate that sends callers there.
    #[error("redirect loop: `{target}` is guarded by the {gate} gate it satisfies")]
    RedirectLoop { target: String, gate: &'static str },

    /// The HTTP client used for upstream forwarding could not be built.
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// ResolveError
///
/// Reasons a session resolver could not establish an identity. These never
/// leave the decision engine; they are logged and treated as unauthenticated.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("session token has expired")]
    Expired,

    #[error("session token rejected: {0}")]
    Invalid(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl From<jsonwebtoken::errors::Error> for ResolveError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ResolveError::Expired,
            _ => ResolveError::Invalid(err.to_string()),
        }
    }
}

/// TargetError
///
/// A request target that cannot be reduced to one unambiguous path. Such
/// requests are refused before any policy is consulted.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("malformed request target `{0}`")]
    Malformed(String),

    /// Dot segments hidden behind encoded separators (`%2f..%2f`).
    #[error("request target `{0}` contains an encoded dot segment")]
    DotSegment(String),
}

impl IntoResponse for TargetError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "request target rejected");
        StatusCode::BAD_REQUEST.into_response()
    }
}

/// ProxyError
///
/// Failures while relaying an allowed request to the upstream application.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// The client body stream failed before it could be read in full.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] axum::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "upstream forwarding failed");
        let status = match self {
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        status.into_response()
    }
}
