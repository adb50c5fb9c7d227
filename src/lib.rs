use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Decision engine and the pieces it is assembled from.
pub mod engine;
pub mod policy;
pub mod public;
pub mod redirect;
pub mod session;
pub mod target;

// Identity provider adapter, upstream forwarding and configuration.
pub mod auth;
pub mod config;
pub mod error;
pub mod proxy;

// --- Public Re-exports ---

pub use auth::JwtSessionResolver;
pub use config::{AppConfig, Env};
pub use engine::{Decision, Gateway, Outcome};
pub use error::{ConfigError, ProxyError, ResolveError, TargetError};
pub use policy::{Gate, PolicySpec, Requirements, RouteTable};
pub use public::PublicPaths;
pub use redirect::RedirectTarget;
pub use session::{CapabilitySnapshot, Resolution, SessionResolver, SessionState};
pub use proxy::Upstream;
pub use target::RequestTarget;

/// AppState
///
/// Everything a request needs, built once at startup and cloned cheaply into
/// each handler. There is no other shared state.
#[derive(Clone)]
pub struct AppState {
    /// The decision engine with its compiled policy table.
    pub gateway: Arc<Gateway>,
    /// The identity provider adapter.
    pub sessions: SessionState,
    /// Where allowed requests are forwarded.
    pub upstream: Upstream,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Builds the engine and upstream client from `config`, using the
    /// supplied resolver for session lookups.
    pub fn new(config: AppConfig, sessions: SessionState) -> Result<Self, ConfigError> {
        let gateway = Arc::new(Gateway::from_config(&config)?);
        let upstream = Upstream::new(config.upstream_url.clone())?;

        Ok(Self {
            gateway,
            sessions,
            upstream,
            config,
        })
    }

    /// `new` with the JWT session resolver configured from `config`.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let sessions = Arc::new(JwtSessionResolver::from_config(&config)) as SessionState;
        Self::new(config, sessions)
    }
}

// --- Axum FromRef Extractor Implementations ---

// Lets the fallback forwarder pull only the upstream handle from AppState.
impl FromRef<AppState> for Upstream {
    fn from_ref(app_state: &AppState) -> Upstream {
        app_state.upstream.clone()
    }
}

/// gateway_middleware
///
/// Runs the decision engine in front of every route.
///
/// The request target is normalized first and the request continues with the
/// normalized URI, so policies see exactly the path the upstream will see.
/// Targets that cannot be normalized get a `400`.
///
/// * `HealthCheck` is answered here with a plain `200 OK`.
/// * `PublicAllow` and `Allowed` continue to the inner service.
/// * Any redirect outcome short-circuits with a `307` to the built target.
async fn gateway_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let target = match RequestTarget::parse(&parts.uri) {
        Ok(target) => target,
        Err(err) => return err.into_response(),
    };
    parts.uri = target.uri().clone();

    let outcome = state
        .gateway
        .evaluate(&target, &parts, state.sessions.as_ref())
        .await;

    if outcome == Outcome::HealthCheck {
        return (StatusCode::OK, "OK").into_response();
    }

    match outcome.decision() {
        Decision::Allow => next.run(Request::from_parts(parts, body)).await,
        Decision::RedirectTo(redirect) => {
            tracing::info!(
                path = target.path(),
                outcome = outcome.label(),
                location = %redirect.location(),
                "request redirected"
            );
            redirect.into_response()
        }
    }
}

/// create_router
///
/// Assembles the gateway: every request passes the decision middleware, and
/// whatever it allows falls through to the upstream forwarder.
pub fn create_router(state: AppState) -> Router {
    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gateway_middleware,
        ))
        .with_state(state);

    // Observability and correlation layers wrap the whole stack.
    base_router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set above so
/// every gateway log line for one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
