use serde::{Deserialize, Serialize};

/// Named weighting scenario. Unrecognized names resolve to [`Scenario::BaseCase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    #[serde(rename = "Base Case")]
    BaseCase,
    #[serde(rename = "Optimistic")]
    Optimistic,
    #[serde(rename = "Pessimistic")]
    Pessimistic,
    #[serde(rename = "Equity-Focused")]
    EquityFocused,
    #[serde(rename = "Performance-Driven")]
    PerformanceDriven,
}

impl Scenario {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::BaseCase,
            Self::Optimistic,
            Self::Pessimistic,
            Self::EquityFocused,
            Self::PerformanceDriven,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BaseCase => "Base Case",
            Self::Optimistic => "Optimistic",
            Self::Pessimistic => "Pessimistic",
            Self::EquityFocused => "Equity-Focused",
            Self::PerformanceDriven => "Performance-Driven",
        }
    }

    /// Exact, case-sensitive lookup by label.
    pub fn from_label(name: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|scenario| scenario.label() == name)
    }

    /// Lookup used by the engine: anything unrecognized is the base case.
    pub fn resolve(name: &str) -> Self {
        match Self::from_label(name) {
            Some(scenario) => scenario,
            None => {
                tracing::debug!(scenario = name, "unrecognized scenario, using Base Case");
                Self::BaseCase
            }
        }
    }

    pub const fn multipliers(self) -> ScenarioMultipliers {
        let (income, energy_burden, poverty, performance) = match self {
            Self::BaseCase => (1.0, 1.0, 1.0, 1.0),
            Self::Optimistic => (0.9, 1.1, 0.9, 1.2),
            Self::Pessimistic => (1.2, 1.3, 1.1, 0.8),
            Self::EquityFocused => (1.4, 1.2, 1.3, 0.7),
            Self::PerformanceDriven => (0.7, 0.8, 0.6, 1.5),
        };

        ScenarioMultipliers {
            income,
            energy_burden,
            poverty,
            performance,
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::BaseCase
    }
}

/// Multipliers applied to the weighted terms of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMultipliers {
    #[serde(rename = "scenario_income_mult")]
    pub income: f64,
    #[serde(rename = "scenario_energy_mult")]
    pub energy_burden: f64,
    #[serde(rename = "scenario_poverty_mult")]
    pub poverty: f64,
    #[serde(rename = "scenario_performance_mult")]
    pub performance: f64,
}
