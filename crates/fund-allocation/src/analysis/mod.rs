//! Run-level analyses built on repeated, independent engine runs.

pub mod monte_carlo;
pub mod scenarios;
pub mod sensitivity;
pub mod variants;

pub use monte_carlo::{
    run_monte_carlo, MonteCarloConfig, MonteCarloError, MonteCarloReport, MonteCarloStatistics,
    NoiseDistribution, PerturbedColumn, SimulationResult, UncertaintyFactor,
};
pub use scenarios::{compare_scenarios, ScenarioComparison};
pub use sensitivity::{run_sensitivity, SensitivityParameter, SensitivityPoint};
pub use variants::{run_variants, DataVariant, FundingVariant, VariantError, VariantRun};

use crate::allocation::AllocationOutcome;
use crate::equity::indices;
use serde::Serialize;

/// Aggregate view of one allocation vector, shared by the analyses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationStats {
    pub total_allocation: f64,
    pub mean_allocation: f64,
    pub std_allocation: f64,
    pub coefficient_variation: f64,
    pub min_allocation: f64,
    pub max_allocation: f64,
    pub range_allocation: f64,
    pub households_served_total: f64,
    /// Mean over regions where the ratio is defined.
    pub avg_allocation_per_household: Option<f64>,
}

impl AllocationStats {
    pub fn from_outcome(outcome: &AllocationOutcome) -> Self {
        let allocations = outcome.final_allocations();
        let min_allocation = allocations.iter().copied().fold(f64::INFINITY, f64::min);
        let max_allocation = allocations
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let households_served_total = outcome
            .rows
            .iter()
            .filter_map(|row| row.metrics.expected_households_served)
            .sum();
        let per_household: Vec<f64> = outcome
            .rows
            .iter()
            .filter_map(|row| row.metrics.allocation_per_household)
            .collect();

        Self {
            total_allocation: allocations.iter().sum(),
            mean_allocation: indices::mean(&allocations).unwrap_or(0.0),
            std_allocation: indices::std_dev(&allocations).unwrap_or(0.0),
            coefficient_variation: indices::coefficient_of_variation(&allocations),
            min_allocation,
            max_allocation,
            range_allocation: max_allocation - min_allocation,
            households_served_total,
            avg_allocation_per_household: indices::mean(&per_household),
        }
    }
}
