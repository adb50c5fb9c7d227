//! The decision engine.
//!
//! `Gateway` owns the immutable routing configuration and answers one
//! question per request: let it through, or send it somewhere else.
//!
//! ```text
//! path ─► health check? ─► public prefix? ─► policy lookup ─► resolve session ─► gates
//!            │                  │                 │                               │
//!         HealthCheck      PublicAllow        Allowed          Auth/Approval/OnboardingRedirect
//!                                                              OnboardedRedirect or Allowed
//! ```
//!
//! Paths reaching the engine are already normalized (see `RequestTarget`).

use axum::http::request::Parts;

use crate::{
    config::AppConfig,
    error::ConfigError,
    policy::{Gate, RoutePolicy, RouteTable},
    public::PublicPaths,
    redirect::RedirectTarget,
    session::{Resolution, SessionResolver},
    target::RequestTarget,
};

/// Decision
///
/// What the HTTP layer does with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(RedirectTarget),
}

/// Outcome
///
/// The terminal state reached by the engine, kept distinct so callers (and
/// logs) can tell why a request was allowed or redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    HealthCheck,
    PublicAllow,
    Allowed,
    AuthRedirect(RedirectTarget),
    ApprovalRedirect(RedirectTarget),
    OnboardingRedirect(RedirectTarget),
    /// A caller who already finished onboarding asked for the onboarding page.
    OnboardedRedirect(RedirectTarget),
}

impl Outcome {
    pub fn decision(&self) -> Decision {
        match self {
            Outcome::HealthCheck | Outcome::PublicAllow | Outcome::Allowed => Decision::Allow,
            Outcome::AuthRedirect(target)
            | Outcome::ApprovalRedirect(target)
            | Outcome::OnboardingRedirect(target)
            | Outcome::OnboardedRedirect(target) => Decision::RedirectTo(target.clone()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::HealthCheck => "health_check",
            Outcome::PublicAllow => "public",
            Outcome::Allowed => "allowed",
            Outcome::AuthRedirect(_) => "auth_redirect",
            Outcome::ApprovalRedirect(_) => "approval_redirect",
            Outcome::OnboardingRedirect(_) => "onboarding_redirect",
            Outcome::OnboardedRedirect(_) => "onboarded_redirect",
        }
    }
}

/// Route
///
/// How a path classifies before any session is looked at.
#[derive(Debug, Clone, Copy)]
pub enum Route<'a> {
    HealthCheck,
    Public,
    Unlisted,
    Guarded(&'a RoutePolicy),
}

/// Gateway
///
/// The request-authorization engine. Built once at startup from explicit
/// configuration and shared read-only between requests.
#[derive(Debug, Clone)]
pub struct Gateway {
    health_check_path: String,
    public: PublicPaths,
    table: RouteTable,
    approval_redirect: String,
    onboarding_redirect: String,
    onboarded_redirect: Option<String>,
}

impl Gateway {
    /// Assembles a gateway and rejects configurations that would redirect a
    /// caller onto a page guarded by the very gate they just failed.
    pub fn new(
        health_check_path: impl Into<String>,
        public: PublicPaths,
        table: RouteTable,
        approval_redirect: impl Into<String>,
        onboarding_redirect: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let gateway = Self {
            health_check_path: health_check_path.into(),
            public,
            table,
            approval_redirect: approval_redirect.into(),
            onboarding_redirect: onboarding_redirect.into(),
            onboarded_redirect: None,
        };

        for path in [
            &gateway.health_check_path,
            &gateway.approval_redirect,
            &gateway.onboarding_redirect,
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::RelativePath(path.clone()));
            }
        }

        gateway.check_redirect_loops()?;
        Ok(gateway)
    }

    /// Sends callers who have finished onboarding away from the onboarding
    /// page (and anything below it) to `home`.
    pub fn with_onboarded_redirect(mut self, home: impl Into<String>) -> Result<Self, ConfigError> {
        let home = home.into();
        if !home.starts_with('/') {
            return Err(ConfigError::RelativePath(home));
        }
        if self.is_onboarding_page(&home) {
            return Err(ConfigError::RedirectLoop {
                target: home,
                gate: Gate::Onboarding.name(),
            });
        }
        self.onboarded_redirect = Some(home);
        Ok(self)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let gateway = Self::new(
            config.health_check_path.clone(),
            PublicPaths::new(config.public_paths.iter().cloned()),
            RouteTable::compile(&config.route_policies)?,
            config.approval_redirect.clone(),
            config.onboarding_redirect.clone(),
        )?;

        match &config.onboarded_redirect {
            Some(home) => gateway.with_onboarded_redirect(home.clone()),
            None => Ok(gateway),
        }
    }

    fn check_redirect_loops(&self) -> Result<(), ConfigError> {
        let guarded_by = |target: &str, gate: Gate| match self.classify(target) {
            Route::Guarded(policy) => policy.requires.contains(gate),
            _ => false,
        };

        let mut targets: Vec<(&str, Gate)> = self
            .table
            .iter()
            .filter(|policy| policy.requires.contains(Gate::Auth))
            .map(|policy| (policy.redirect_to.as_str(), Gate::Auth))
            .collect();
        targets.push((self.approval_redirect.as_str(), Gate::Approval));
        targets.push((self.onboarding_redirect.as_str(), Gate::Onboarding));

        match targets
            .into_iter()
            .find(|(target, gate)| guarded_by(target, *gate))
        {
            Some((target, gate)) => Err(ConfigError::RedirectLoop {
                target: target.to_string(),
                gate: gate.name(),
            }),
            None => Ok(()),
        }
    }

    pub fn health_check_path(&self) -> &str {
        &self.health_check_path
    }

    pub fn policy_count(&self) -> usize {
        self.table.len()
    }

    fn is_onboarding_page(&self, path: &str) -> bool {
        path.strip_prefix(self.onboarding_redirect.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Classifies `path` without consulting any session.
    pub fn classify(&self, path: &str) -> Route<'_> {
        if path == self.health_check_path {
            return Route::HealthCheck;
        }
        if self.public.is_public(path) {
            return Route::Public;
        }
        match self.table.lookup(path) {
            Some(policy) => Route::Guarded(policy),
            None => Route::Unlisted,
        }
    }

    /// Applies `policy`'s gates, in order, to a resolved caller.
    /// Stops at the first unmet gate.
    pub fn gate(&self, policy: &RoutePolicy, path: &str, resolution: &Resolution) -> Outcome {
        match policy
            .requires
            .gates()
            .find(|gate| !resolution.satisfies(*gate))
        {
            None => match &self.onboarded_redirect {
                Some(home)
                    if resolution.satisfies(Gate::Onboarding) && self.is_onboarding_page(path) =>
                {
                    Outcome::OnboardedRedirect(RedirectTarget::to(home))
                }
                _ => Outcome::Allowed,
            },
            Some(Gate::Auth) => {
                Outcome::AuthRedirect(RedirectTarget::with_callback(&policy.redirect_to, path))
            }
            Some(Gate::Approval) => {
                Outcome::ApprovalRedirect(RedirectTarget::to(&self.approval_redirect))
            }
            Some(Gate::Onboarding) => {
                Outcome::OnboardingRedirect(RedirectTarget::to(&self.onboarding_redirect))
            }
        }
    }

    /// Decides a request whose session is already resolved.
    pub fn decide(&self, path: &str, resolution: &Resolution) -> Outcome {
        match self.classify(path) {
            Route::HealthCheck => Outcome::HealthCheck,
            Route::Public => Outcome::PublicAllow,
            Route::Unlisted => Outcome::Allowed,
            Route::Guarded(policy) => self.gate(policy, path, resolution),
        }
    }

    /// Decides a live request. The resolver is only consulted when a policy
    /// guards the path, and any resolver error counts as unauthenticated.
    pub async fn evaluate(
        &self,
        target: &RequestTarget,
        parts: &Parts,
        resolver: &dyn SessionResolver,
    ) -> Outcome {
        let path = target.path();

        let policy = match self.classify(path) {
            Route::HealthCheck => return Outcome::HealthCheck,
            Route::Public => return Outcome::PublicAllow,
            Route::Unlisted => return Outcome::Allowed,
            Route::Guarded(policy) => policy,
        };

        let resolution = resolver.resolve(parts).await.unwrap_or_else(|err| {
            tracing::debug!(error = %err, path, "session resolution failed");
            Resolution::Unauthenticated
        });

        let outcome = self.gate(policy, path, &resolution);
        tracing::debug!(
            path,
            policy = policy.source(),
            authenticated = resolution.is_authenticated(),
            outcome = outcome.label(),
            "gates evaluated"
        );
        outcome
    }
}
