use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Gate
///
/// A single capability requirement a route can demand of its caller.
/// `Gate::ORDER` is the order the decision engine checks them in; the first
/// unmet gate decides the redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    Auth,
    Approval,
    Onboarding,
}

impl Gate {
    pub const ORDER: [Gate; 3] = [Gate::Auth, Gate::Approval, Gate::Onboarding];

    pub fn name(self) -> &'static str {
        match self {
            Gate::Auth => "auth",
            Gate::Approval => "approval",
            Gate::Onboarding => "onboarding",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Gate::Auth => 0b001,
            Gate::Approval => 0b010,
            Gate::Onboarding => 0b100,
        }
    }
}

/// Requirements
///
/// The set of gates a policy enforces. Each gate is independent, so a policy
/// may for example demand onboarding without demanding approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Gate>", into = "Vec<Gate>")]
pub struct Requirements(u8);

impl Requirements {
    pub const NONE: Requirements = Requirements(0);
    pub const ALL: Requirements = Requirements(0b111);

    pub fn with(self, gate: Gate) -> Self {
        Requirements(self.0 | gate.bit())
    }

    pub fn contains(self, gate: Gate) -> bool {
        self.0 & gate.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Required gates, in evaluation order.
    pub fn gates(self) -> impl Iterator<Item = Gate> {
        Gate::ORDER.into_iter().filter(move |gate| self.contains(*gate))
    }

    /// Every one of the eight possible gate combinations.
    pub fn all_combinations() -> impl Iterator<Item = Requirements> {
        (0..=Self::ALL.0).map(Requirements)
    }
}

impl From<Vec<Gate>> for Requirements {
    fn from(gates: Vec<Gate>) -> Self {
        gates.into_iter().fold(Requirements::NONE, Requirements::with)
    }
}

impl From<Requirements> for Vec<Gate> {
    fn from(requirements: Requirements) -> Self {
        requirements.gates().collect()
    }
}

impl FromIterator<Gate> for Requirements {
    fn from_iter<I: IntoIterator<Item = Gate>>(iter: I) -> Self {
        iter.into_iter().fold(Requirements::NONE, Requirements::with)
    }
}

fn default_redirect() -> String {
    "/login".to_string()
}

/// PolicySpec
///
/// The configuration form of a route policy, as read from `ROUTE_POLICIES`.
/// Patterns are regular expressions matched against the start of the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub pattern: String,
    #[serde(default)]
    pub requires: Requirements,
    #[serde(default = "default_redirect")]
    pub redirect_to: String,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl PolicySpec {
    pub fn new(pattern: impl Into<String>, requires: Requirements) -> Self {
        Self {
            pattern: pattern.into(),
            requires,
            redirect_to: default_redirect(),
            exclude: Vec::new(),
        }
    }

    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = target.into();
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }
}

/// The policy table used when `ROUTE_POLICIES` is not set.
pub fn default_policies() -> Vec<PolicySpec> {
    vec![
        PolicySpec::new("/dashboard", Requirements::ALL).exclude("/dashboard/public"),
        PolicySpec::new("/onboarding", Requirements::NONE.with(Gate::Auth)),
        PolicySpec::new("/settings", Requirements::ALL),
        PolicySpec::new("/app", Requirements::ALL),
    ]
}

/// Compiles `pattern` so it only matches at the start of a path.
fn prefix_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// RoutePolicy
///
/// A compiled `PolicySpec`.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    source: String,
    pattern: Regex,
    exclusions: Vec<Regex>,
    pub requires: Requirements,
    pub redirect_to: String,
}

impl RoutePolicy {
    pub fn compile(spec: &PolicySpec) -> Result<Self, ConfigError> {
        if !spec.redirect_to.starts_with('/') {
            return Err(ConfigError::RelativePath(spec.redirect_to.clone()));
        }

        let exclusions = spec
            .exclude
            .iter()
            .map(|pattern| prefix_regex(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: spec.pattern.clone(),
            pattern: prefix_regex(&spec.pattern)?,
            exclusions,
            requires: spec.requires,
            redirect_to: spec.redirect_to.clone(),
        })
    }

    /// The pattern as it was written in configuration.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True if the pattern matches and no exclusion carves the path out.
    pub fn applies_to(&self, path: &str) -> bool {
        self.pattern.is_match(path) && !self.exclusions.iter().any(|ex| ex.is_match(path))
    }
}

/// RouteTable
///
/// The ordered policy list. Declaration order is precedence order: the first
/// policy that applies to a path is the only one consulted for it.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    policies: Vec<RoutePolicy>,
}

impl RouteTable {
    pub fn compile(specs: &[PolicySpec]) -> Result<Self, ConfigError> {
        let policies = specs
            .iter()
            .map(RoutePolicy::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { policies })
    }

    /// First policy that applies to `path`, skipping any whose exclusions match.
    pub fn lookup(&self, path: &str) -> Option<&RoutePolicy> {
        self.policies.iter().find(|policy| policy.applies_to(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutePolicy> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
