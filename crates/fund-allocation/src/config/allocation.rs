use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Criterion weights. Need weights conventionally sum to 0.70 and performance
/// weights to 0.30; the sums are checked only for a logged warning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionWeights {
    pub income_level: f64,
    pub energy_burden: f64,
    pub poverty_rate: f64,
    pub vulnerable_population: f64,
    pub prior_utilization: f64,
    pub compliance_score: f64,
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self {
            income_level: 0.25,
            energy_burden: 0.30,
            poverty_rate: 0.20,
            vulnerable_population: 0.05,
            prior_utilization: 0.15,
            compliance_score: 0.10,
        }
    }
}

impl CriterionWeights {
    pub fn need_total(&self) -> f64 {
        self.income_level + self.energy_burden + self.poverty_rate + self.vulnerable_population
    }

    pub fn performance_total(&self) -> f64 {
        self.prior_utilization + self.compliance_score
    }

    fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("income_level", self.income_level),
            ("energy_burden", self.energy_burden),
            ("poverty_rate", self.poverty_rate),
            ("vulnerable_population", self.vulnerable_population),
            ("prior_utilization", self.prior_utilization),
            ("compliance_score", self.compliance_score),
        ]
    }
}

/// Size of the pool and the per-region bounds, as fractions of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingConfig {
    pub available_for_allocation: f64,
    pub minimum_floor: f64,
    pub maximum_cap: f64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            available_for_allocation: 6_460_000.0,
            minimum_floor: 0.04,
            maximum_cap: 0.22,
        }
    }
}

impl FundingConfig {
    pub fn floor_amount(&self) -> f64 {
        self.available_for_allocation * self.minimum_floor
    }

    pub fn cap_amount(&self) -> f64 {
        self.available_for_allocation * self.maximum_cap
    }
}

/// Controls for the rescale-and-clip solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedistributionConfig {
    /// Absolute currency tolerance on total-funding conservation.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RedistributionConfig {
    fn default() -> Self {
        Self {
            tolerance: 100.0,
            max_iterations: 100,
        }
    }
}

/// Targets used by the equity summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquityTargets {
    pub coefficient_variation_max: f64,
    pub gini_coefficient_max: f64,
    pub urban_rural_ratio_max: f64,
    pub geographic_equity_min: f64,
    pub urban_regions: Vec<String>,
}

impl Default for EquityTargets {
    fn default() -> Self {
        Self {
            coefficient_variation_max: 0.30,
            gini_coefficient_max: 0.35,
            urban_rural_ratio_max: 2.0,
            geographic_equity_min: 0.90,
            urban_regions: [
                "Jefferson County",
                "Madison County",
                "Mobile County",
                "Montgomery County",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

/// Immutable configuration for a single allocation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub weights: CriterionWeights,
    pub funding: FundingConfig,
    pub redistribution: RedistributionConfig,
    pub equity: EquityTargets,
}

const BOUNDS_EPSILON: f64 = 1e-9;
const WEIGHT_GROUP_DRIFT: f64 = 0.01;

impl AllocationConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AllocationConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| AllocationConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AllocationConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Setup-time checks, including feasibility of the floor/cap bounds for a
    /// table of `n_regions` rows.
    pub fn validate(&self, n_regions: usize) -> Result<(), AllocationConfigError> {
        for (name, value) in self.weights.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(AllocationConfigError::InvalidWeight { name, value });
            }
        }

        let funding = &self.funding;
        if !funding.available_for_allocation.is_finite() || funding.available_for_allocation <= 0.0
        {
            return Err(AllocationConfigError::InvalidFunding(
                funding.available_for_allocation,
            ));
        }

        let bounds_valid = funding.minimum_floor.is_finite()
            && funding.maximum_cap.is_finite()
            && funding.minimum_floor >= 0.0
            && funding.minimum_floor <= funding.maximum_cap;
        if !bounds_valid {
            return Err(AllocationConfigError::InvalidBounds {
                minimum_floor: funding.minimum_floor,
                maximum_cap: funding.maximum_cap,
            });
        }

        let n = n_regions as f64;
        if funding.minimum_floor * n > 1.0 + BOUNDS_EPSILON
            || funding.maximum_cap * n < 1.0 - BOUNDS_EPSILON
        {
            return Err(AllocationConfigError::InfeasibleBounds {
                minimum_floor: funding.minimum_floor,
                maximum_cap: funding.maximum_cap,
                n_regions,
            });
        }

        let redistribution = &self.redistribution;
        if !redistribution.tolerance.is_finite() || redistribution.tolerance <= 0.0 {
            return Err(AllocationConfigError::InvalidTolerance(
                redistribution.tolerance,
            ));
        }
        if redistribution.max_iterations == 0 {
            return Err(AllocationConfigError::ZeroIterations);
        }

        let need = self.weights.need_total();
        let performance = self.weights.performance_total();
        if (need - 0.70).abs() > WEIGHT_GROUP_DRIFT
            || (performance - 0.30).abs() > WEIGHT_GROUP_DRIFT
        {
            tracing::warn!(
                need_weight_total = need,
                performance_weight_total = performance,
                "criterion weights drift from the 0.70/0.30 need/performance split"
            );
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum AllocationConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidWeight {
        name: &'static str,
        value: f64,
    },
    InvalidFunding(f64),
    InvalidBounds {
        minimum_floor: f64,
        maximum_cap: f64,
    },
    InfeasibleBounds {
        minimum_floor: f64,
        maximum_cap: f64,
        n_regions: usize,
    },
    InvalidTolerance(f64),
    ZeroIterations,
}

impl fmt::Display for AllocationConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationConfigError::Read { path, .. } => {
                write!(f, "unable to read allocation config {}", path.display())
            }
            AllocationConfigError::Parse { path, source } => {
                write!(
                    f,
                    "allocation config {} is not valid JSON: {}",
                    path.display(),
                    source
                )
            }
            AllocationConfigError::InvalidWeight { name, value } => {
                write!(f, "weight {name} must be a non-negative number, got {value}")
            }
            AllocationConfigError::InvalidFunding(value) => {
                write!(f, "available_for_allocation must be positive, got {value}")
            }
            AllocationConfigError::InvalidBounds {
                minimum_floor,
                maximum_cap,
            } => write!(
                f,
                "minimum_floor ({minimum_floor}) must be non-negative and not exceed maximum_cap ({maximum_cap})"
            ),
            AllocationConfigError::InfeasibleBounds {
                minimum_floor,
                maximum_cap,
                n_regions,
            } => write!(
                f,
                "floor {minimum_floor} and cap {maximum_cap} cannot conserve the pool across {n_regions} regions (need floor*n <= 1 <= cap*n)"
            ),
            AllocationConfigError::InvalidTolerance(value) => {
                write!(f, "redistribution tolerance must be positive, got {value}")
            }
            AllocationConfigError::ZeroIterations => {
                write!(f, "redistribution max_iterations must be at least 1")
            }
        }
    }
}

impl std::error::Error for AllocationConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AllocationConfigError::Read { source, .. } => Some(source),
            AllocationConfigError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}
