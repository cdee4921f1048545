//! Multi-criteria allocation of a fixed funding pool across regions.
//!
//! Stages run in a fixed order, each appending columns to the region rows:
//! normalization, scenario weighting, composite scoring, proportional
//! allocation, floor/cap clipping, rescale-and-clip redistribution, and
//! final metrics. The pipeline is synchronous and holds no state between
//! runs, so independent runs can be executed on separate threads.

pub mod diagnostics;
pub mod distribution;
pub mod domain;
pub mod metrics;
pub(crate) mod normalizer;
pub mod redistribution;
pub mod scenario;
pub(crate) mod scoring;

pub use diagnostics::AllocationDiagnostic;
pub use distribution::AllocationBounds;
pub use domain::{
    AllocatedRegion, BoundedAllocation, CompositeScores, CriterionScores, RegionMetrics,
    RegionRecord,
};
pub use normalizer::NEUTRAL_SCORE;
pub use redistribution::Redistribution;
pub use scenario::{Scenario, ScenarioMultipliers};

use crate::config::{AllocationConfig, AllocationConfigError};
use crate::regions::{RegionTable, RegionValidationError};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error(transparent)]
    Validation(#[from] RegionValidationError),
    #[error("invalid allocation configuration: {0}")]
    Config(#[from] AllocationConfigError),
}

/// Summary of the solver run attached to every outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedistributionSummary {
    pub total_funding: f64,
    pub floor_amount: f64,
    pub cap_amount: f64,
    pub allocated_total: f64,
    pub iterations: usize,
    pub converged: bool,
    pub residual: f64,
}

/// Output of one allocation run: the augmented rows plus run annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationOutcome {
    pub scenario: Scenario,
    pub requested_scenario: String,
    pub redistribution: RedistributionSummary,
    pub rows: Vec<AllocatedRegion>,
    pub diagnostics: Vec<AllocationDiagnostic>,
}

impl AllocationOutcome {
    pub fn final_allocations(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.final_allocation).collect()
    }

    pub fn row(&self, region_name: &str) -> Option<&AllocatedRegion> {
        self.rows
            .iter()
            .find(|row| row.region.region_name == region_name)
    }
}

/// Stateless engine applying one configuration to region tables.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Runs every stage for `table` under the named scenario. Unknown
    /// scenario names run as the base case.
    pub fn allocate(
        &self,
        table: &RegionTable,
        scenario_name: &str,
    ) -> Result<AllocationOutcome, AllocationError> {
        self.config.validate(table.len())?;

        let scenario = Scenario::resolve(scenario_name);
        let funding = self.config.funding;
        let total_funding = funding.available_for_allocation;
        let bounds = AllocationBounds {
            floor: funding.floor_amount(),
            cap: funding.cap_amount(),
        };
        let mut diagnostics = Vec::new();

        let scores = normalizer::normalize(table, &mut diagnostics);
        tracing::debug!(regions = table.len(), "criteria normalized");

        let multipliers = scenario.multipliers();
        let composites: Vec<CompositeScores> = scores
            .iter()
            .map(|row_scores| scoring::score(row_scores, &self.config.weights, &multipliers))
            .collect();

        let composite_scores: Vec<f64> = composites
            .iter()
            .map(|scores| scores.composite_score)
            .collect();
        let initial =
            distribution::initial_allocations(&composite_scores, total_funding, &mut diagnostics);
        let bounded = distribution::apply_bounds(&initial, bounds);
        tracing::debug!(
            floor_violations = bounded.iter().filter(|row| row.floor_violation).count(),
            cap_violations = bounded.iter().filter(|row| row.cap_violation).count(),
            "bounds applied"
        );

        let constrained: Vec<f64> = bounded
            .iter()
            .map(|row| row.constrained_allocation)
            .collect();
        let solved = redistribution::redistribute(
            &constrained,
            total_funding,
            bounds,
            self.config.redistribution,
            &mut diagnostics,
        );

        let metrics = metrics::finalize(
            table.rows(),
            &composites,
            &solved.allocations,
            &mut diagnostics,
        );

        let rows = table
            .rows()
            .iter()
            .zip(scores)
            .zip(composites)
            .zip(bounded)
            .zip(&solved.allocations)
            .zip(metrics)
            .map(
                |(((((region, scores), composite), bounded), &final_allocation), metrics)| {
                    AllocatedRegion {
                        region: region.clone(),
                        scores,
                        multipliers,
                        composite,
                        bounded,
                        final_allocation,
                        redistribution_iterations: solved.iterations,
                        metrics,
                    }
                },
            )
            .collect();

        let redistribution = RedistributionSummary {
            total_funding,
            floor_amount: bounds.floor,
            cap_amount: bounds.cap,
            allocated_total: solved.allocations.iter().sum(),
            iterations: solved.iterations,
            converged: solved.converged,
            residual: solved.residual,
        };

        tracing::info!(
            scenario = scenario.label(),
            regions = table.len(),
            iterations = solved.iterations,
            converged = solved.converged,
            diagnostics = diagnostics.len(),
            "allocation run complete"
        );

        Ok(AllocationOutcome {
            scenario,
            requested_scenario: scenario_name.to_string(),
            redistribution,
            rows,
            diagnostics,
        })
    }
}
