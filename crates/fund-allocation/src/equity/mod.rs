//! Distributional summaries computed from a finished allocation.
//!
//! Everything here reads the output rows only; nothing feeds back into the
//! pipeline.

pub mod indices;

use crate::allocation::AllocationOutcome;
use crate::config::EquityTargets;
use serde::Serialize;

pub const ATKINSON_EPSILON: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquitySummary {
    pub coefficient_variation: f64,
    pub gini_coefficient: f64,
    pub theil_index: f64,
    pub atkinson_index: f64,
    pub hoover_index: f64,
    pub urban_avg_per_capita: Option<f64>,
    pub rural_avg_per_capita: Option<f64>,
    pub urban_rural_ratio: f64,
    pub urban_count: usize,
    pub rural_count: usize,
    /// Pearson correlation of population share against allocation share.
    pub population_allocation_correlation: Option<f64>,
    pub targets: EquityAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetAssessment {
    pub current: f64,
    pub target: f64,
    pub meets_target: bool,
    pub gap: f64,
}

impl TargetAssessment {
    fn at_most(current: f64, target: f64) -> Self {
        Self {
            current,
            target,
            meets_target: current <= target,
            gap: current - target,
        }
    }

    fn at_least(current: f64, target: f64) -> Self {
        Self {
            current,
            target,
            meets_target: current >= target,
            gap: target - current,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityAssessment {
    pub coefficient_variation: TargetAssessment,
    pub gini_coefficient: TargetAssessment,
    pub urban_rural_ratio: TargetAssessment,
    /// Absent when the correlation is undefined (uniform populations or
    /// allocations).
    pub geographic_equity: Option<TargetAssessment>,
}

impl EquitySummary {
    pub fn from_outcome(outcome: &AllocationOutcome, targets: &EquityTargets) -> Self {
        let allocations = outcome.final_allocations();
        let populations: Vec<f64> = outcome
            .rows
            .iter()
            .map(|row| row.region.total_population)
            .collect();

        let mut urban = Vec::new();
        let mut rural = Vec::new();
        for row in &outcome.rows {
            let bucket = if targets
                .urban_regions
                .iter()
                .any(|name| name == &row.region.region_name)
            {
                &mut urban
            } else {
                &mut rural
            };
            if let Some(per_capita) = row.metrics.allocation_per_capita {
                bucket.push(per_capita);
            }
        }
        let urban_avg_per_capita = indices::mean(&urban);
        let rural_avg_per_capita = indices::mean(&rural);
        let urban_rural_ratio = match (urban_avg_per_capita, rural_avg_per_capita) {
            (Some(urban), Some(rural)) if rural > 0.0 => urban / rural,
            (None, Some(rural)) if rural > 0.0 => 0.0,
            _ => 1.0,
        };

        let coefficient_variation = indices::coefficient_of_variation(&allocations);
        let gini_coefficient = indices::gini(&allocations);
        let population_allocation_correlation = indices::pearson(&populations, &allocations);

        let assessment = EquityAssessment {
            coefficient_variation: TargetAssessment::at_most(
                coefficient_variation,
                targets.coefficient_variation_max,
            ),
            gini_coefficient: TargetAssessment::at_most(
                gini_coefficient,
                targets.gini_coefficient_max,
            ),
            urban_rural_ratio: {
                let mut assessment =
                    TargetAssessment::at_most(urban_rural_ratio, targets.urban_rural_ratio_max);
                assessment.gap = assessment.gap.max(0.0);
                assessment
            },
            geographic_equity: population_allocation_correlation.map(|correlation| {
                TargetAssessment::at_least(correlation, targets.geographic_equity_min)
            }),
        };

        Self {
            coefficient_variation,
            gini_coefficient,
            theil_index: indices::theil(&allocations),
            atkinson_index: indices::atkinson(&allocations, ATKINSON_EPSILON),
            hoover_index: indices::hoover(&allocations),
            urban_avg_per_capita,
            rural_avg_per_capita,
            urban_rural_ratio,
            urban_count: urban.len(),
            rural_count: rural.len(),
            population_allocation_correlation,
            targets: assessment,
        }
    }

    pub fn targets_met(&self) -> usize {
        let assessment = &self.targets;
        [
            Some(&assessment.coefficient_variation),
            Some(&assessment.gini_coefficient),
            Some(&assessment.urban_rural_ratio),
            assessment.geographic_equity.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter(|target| target.meets_target)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationEngine;
    use crate::config::AllocationConfig;
    use crate::regions::tests::sample_record;
    use crate::regions::RegionTable;

    fn table() -> RegionTable {
        let names = [
            "Jefferson County",
            "Madison County",
            "Baldwin County",
            "Dale County",
            "Lee County",
            "Coffee County",
        ];
        let rows = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let step = index as f64;
                let mut row = sample_record(&format!("REG_{index:03}"), name);
                row.total_population = 80_000.0 + 25_000.0 * step;
                row.energy_burden_pct = 0.10 + 0.01 * step;
                row.median_income = 45_000.0 - 1_500.0 * step;
                row
            })
            .collect();
        RegionTable::new(rows).expect("valid table")
    }

    fn config() -> AllocationConfig {
        let mut config = AllocationConfig::default();
        config.funding.maximum_cap = 0.30;
        config
    }

    #[test]
    fn summary_reflects_allocation_vector() {
        let config = config();
        let outcome = AllocationEngine::new(config.clone())
            .allocate(&table(), "Base Case")
            .expect("allocation succeeds");
        let summary = EquitySummary::from_outcome(&outcome, &config.equity);

        assert_eq!(summary.urban_count, 2);
        assert_eq!(summary.rural_count, 4);
        assert!(summary.gini_coefficient >= 0.0 && summary.gini_coefficient < 1.0);
        assert!(summary.hoover_index >= 0.0 && summary.hoover_index < 1.0);
        assert!(summary.atkinson_index >= 0.0);
        assert!(summary.urban_rural_ratio > 0.0);
        assert_eq!(
            summary.targets.coefficient_variation.current,
            summary.coefficient_variation
        );
        assert!(summary.targets.urban_rural_ratio.gap >= 0.0);
        assert!(summary.targets_met() <= 4);
    }

    #[test]
    fn missing_rural_regions_yield_neutral_ratio() {
        let config = config();
        let outcome = AllocationEngine::new(config.clone())
            .allocate(&table(), "Base Case")
            .expect("allocation succeeds");
        let mut targets = config.equity.clone();
        targets.urban_regions = outcome
            .rows
            .iter()
            .map(|row| row.region.region_name.clone())
            .collect();

        let summary = EquitySummary::from_outcome(&outcome, &targets);
        assert_eq!(summary.rural_count, 0);
        assert_eq!(summary.rural_avg_per_capita, None);
        assert_eq!(summary.urban_rural_ratio, 1.0);
    }

    #[test]
    fn assessment_directions() {
        let capped = TargetAssessment::at_most(0.4, 0.35);
        assert!(!capped.meets_target);
        assert!((capped.gap - 0.05).abs() < 1e-12);

        let floored = TargetAssessment::at_least(0.95, 0.90);
        assert!(floored.meets_target);
        assert!((floored.gap + 0.05).abs() < 1e-12);
    }
}
