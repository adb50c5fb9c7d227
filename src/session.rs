use async_trait::async_trait;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::{error::ResolveError, policy::Gate};

/// CapabilitySnapshot
///
/// The caller's resolved state for a single request. Produced once by a
/// `SessionResolver` and read-only from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySnapshot {
    pub authenticated: bool,
    pub approved: bool,
    pub onboarding_done: bool,
}

/// Resolution
///
/// What a resolver learned about the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Authenticated(CapabilitySnapshot),
    Unauthenticated,
}

impl Resolution {
    /// Whether the caller meets `gate`. An unauthenticated caller meets none.
    pub fn satisfies(&self, gate: Gate) -> bool {
        match self {
            Resolution::Unauthenticated => false,
            Resolution::Authenticated(snapshot) => match gate {
                Gate::Auth => snapshot.authenticated,
                Gate::Approval => snapshot.approved,
                Gate::Onboarding => snapshot.onboarding_done,
            },
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.satisfies(Gate::Auth)
    }
}

/// SessionResolver
///
/// The seam to the identity provider. Implementations turn the credential
/// carried by a request (cookie or header) into a `Resolution`.
///
/// A request without any credential resolves to `Ok(Unauthenticated)`.
/// Anything that goes wrong with a credential that *is* present (expired,
/// malformed, provider unreachable) is reported as a `ResolveError`; the
/// decision engine downgrades it to `Unauthenticated`.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, parts: &Parts) -> Result<Resolution, ResolveError>;
}

/// SessionState
///
/// The shared resolver handle stored in the application state.
pub type SessionState = Arc<dyn SessionResolver>;
