//! Named what-if transformations of the input table and the funding pool.

use super::AllocationStats;
use crate::allocation::{AllocationEngine, AllocationError, RegionRecord};
use crate::config::AllocationConfig;
use crate::equity::EquitySummary;
use crate::regions::{RegionTable, RegionValidationError};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataVariant {
    #[serde(rename = "Recession")]
    Recession,
    #[serde(rename = "Economic Growth")]
    EconomicGrowth,
    #[serde(rename = "Energy Crisis")]
    EnergyCrisis,
    #[serde(rename = "Eligibility Expansion")]
    EligibilityExpansion,
    #[serde(rename = "Benefit Increase (+25%)")]
    BenefitIncrease,
    #[serde(rename = "Performance-Focused")]
    PerformanceFocused,
    #[serde(rename = "Natural Disaster")]
    NaturalDisaster,
    #[serde(rename = "Extreme Weather")]
    ExtremeWeather,
}

impl DataVariant {
    pub const fn all() -> [Self; 8] {
        [
            Self::Recession,
            Self::EconomicGrowth,
            Self::EnergyCrisis,
            Self::EligibilityExpansion,
            Self::BenefitIncrease,
            Self::PerformanceFocused,
            Self::NaturalDisaster,
            Self::ExtremeWeather,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Recession => "Recession",
            Self::EconomicGrowth => "Economic Growth",
            Self::EnergyCrisis => "Energy Crisis",
            Self::EligibilityExpansion => "Eligibility Expansion",
            Self::BenefitIncrease => "Benefit Increase (+25%)",
            Self::PerformanceFocused => "Performance-Focused",
            Self::NaturalDisaster => "Natural Disaster",
            Self::ExtremeWeather => "Extreme Weather",
        }
    }

    pub fn from_label(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|variant| variant.label() == name)
    }

    /// Returns a re-validated copy of `table` with the variant applied.
    pub fn apply(self, table: &RegionTable) -> Result<RegionTable, RegionValidationError> {
        table.map_rows(|row| self.adjust(row))
    }

    fn adjust(self, row: &mut RegionRecord) {
        match self {
            Self::Recession => {
                row.median_income *= 0.85;
                row.poverty_rate = (row.poverty_rate * 1.4).min(0.45);
                row.energy_burden_pct = (row.energy_burden_pct * 1.25).min(0.45);
                row.households_served = (row.households_served * 1.3).floor();
            }
            Self::EconomicGrowth => {
                row.median_income *= 1.12;
                row.poverty_rate *= 0.85;
                row.energy_burden_pct *= 0.88;
                row.households_served = (row.households_served * 0.92).floor();
            }
            Self::EnergyCrisis => {
                row.energy_burden_pct = (row.energy_burden_pct * 1.6).min(0.50);
                row.households_served = (row.households_served * 1.5).floor();
            }
            Self::EligibilityExpansion => {
                // Subpopulations never exceed the region total.
                row.low_income_population =
                    (row.low_income_population * 1.35).floor().min(row.total_population);
                row.households_served = (row.households_served * 1.4).floor();
            }
            Self::BenefitIncrease => {
                row.avg_benefit *= 1.25;
            }
            Self::PerformanceFocused => {
                row.compliance_score = (row.compliance_score * 1.1).min(1.0);
                row.utilization_rate = (row.utilization_rate * 1.05).min(1.0);
            }
            Self::NaturalDisaster => {
                row.median_income *= 0.9;
                row.energy_burden_pct = (row.energy_burden_pct * 1.8).min(0.55);
                row.households_served = (row.households_served * 2.2).floor();
            }
            Self::ExtremeWeather => {
                row.energy_burden_pct = (row.energy_burden_pct * 1.7).min(0.50);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FundingVariant {
    #[serde(rename = "Base Funding")]
    Base,
    #[serde(rename = "Increased Funding (+25%)")]
    Increased,
    #[serde(rename = "Reduced Funding (-20%)")]
    Reduced,
    #[serde(rename = "Emergency Funding (+50%)")]
    Emergency,
}

impl FundingVariant {
    pub const fn all() -> [Self; 4] {
        [Self::Base, Self::Increased, Self::Reduced, Self::Emergency]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Base => "Base Funding",
            Self::Increased => "Increased Funding (+25%)",
            Self::Reduced => "Reduced Funding (-20%)",
            Self::Emergency => "Emergency Funding (+50%)",
        }
    }

    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Increased => 1.25,
            Self::Reduced => 0.80,
            Self::Emergency => 1.50,
        }
    }

    /// Scales the pool; floor and cap stay fractions of the new pool.
    pub fn apply(self, config: &AllocationConfig) -> AllocationConfig {
        let mut adjusted = config.clone();
        adjusted.funding.available_for_allocation *= self.multiplier();
        adjusted
    }
}

/// One engine run under a data or funding variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantRun {
    pub variant: &'static str,
    pub total_funding: f64,
    pub stats: AllocationStats,
    pub equity: EquitySummary,
    pub converged: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    #[error("variant '{variant}' produced invalid rows: {source}")]
    InvalidTable {
        variant: &'static str,
        source: RegionValidationError,
    },
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Re-runs `scenario` once per data variant on the unmodified pool, then once
/// per funding variant on the unmodified table.
pub fn run_variants(
    config: &AllocationConfig,
    table: &RegionTable,
    scenario: &str,
) -> Result<Vec<VariantRun>, VariantError> {
    let base_engine = AllocationEngine::new(config.clone());
    let mut runs = Vec::with_capacity(DataVariant::all().len() + FundingVariant::all().len());

    for variant in DataVariant::all() {
        let adjusted = variant
            .apply(table)
            .map_err(|source| VariantError::InvalidTable {
                variant: variant.label(),
                source,
            })?;
        runs.push(variant_run(variant.label(), &base_engine, &adjusted, scenario)?);
    }

    for variant in FundingVariant::all() {
        let engine = AllocationEngine::new(variant.apply(config));
        runs.push(variant_run(variant.label(), &engine, table, scenario)?);
    }

    Ok(runs)
}

fn variant_run(
    variant: &'static str,
    engine: &AllocationEngine,
    table: &RegionTable,
    scenario: &str,
) -> Result<VariantRun, AllocationError> {
    let outcome = engine.allocate(table, scenario)?;
    tracing::debug!(
        variant,
        converged = outcome.redistribution.converged,
        "variant run complete"
    );
    Ok(VariantRun {
        variant,
        total_funding: outcome.redistribution.total_funding,
        stats: AllocationStats::from_outcome(&outcome),
        equity: EquitySummary::from_outcome(&outcome, &engine.config().equity),
        converged: outcome.redistribution.converged,
    })
}
