//! Initial-population scenarios.

use serde::{Deserialize, Serialize};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Two bodies closing on each other across the first strip edge
    HeadOn,

    /// One body per strip, neighbors drifting toward each other
    Drift,

    /// Seeded uniform population without overlaps
    Random,

    /// Random positions with Gaussian velocities
    Thermal,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::HeadOn,
            ScenarioId::Drift,
            ScenarioId::Random,
            ScenarioId::Thermal,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::HeadOn => "head_on",
            ScenarioId::Drift => "drift",
            ScenarioId::Random => "random",
            ScenarioId::Thermal => "thermal",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::HeadOn => "bodies at 0.3W (vx=+1) and 0.9W (vx=-2) meet at the first edge",
            ScenarioId::Drift => "one body per strip midpoint, neighbors drift into each other",
            ScenarioId::Random => "uniform positions and velocities, no initial overlaps",
            ScenarioId::Thermal => "uniform positions, normally distributed velocities",
        }
    }

    /// Returns true if the population depends on the seed.
    pub fn is_seeded(&self) -> bool {
        matches!(self, ScenarioId::Random | ScenarioId::Thermal)
    }
}

impl Default for ScenarioId {
    fn default() -> Self {
        ScenarioId::Random
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "head_on" | "headon" => Ok(ScenarioId::HeadOn),
            "drift" | "trivial" => Ok(ScenarioId::Drift),
            "random" => Ok(ScenarioId::Random),
            "thermal" => Ok(ScenarioId::Thermal),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
