use super::AllocationStats;
use crate::allocation::{AllocationEngine, AllocationError};
use crate::config::AllocationConfig;
use crate::regions::RegionTable;
use serde::Serialize;

/// Input scaled by a sensitivity sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityParameter {
    /// Multiplies `energy_burden_pct`.
    EnergyBurdenMultiplier,
    /// Multiplies `median_income`.
    IncomeThreshold,
    /// Multiplies `compliance_score`.
    ComplianceThreshold,
    /// Multiplies the funding pool.
    FundingLevel,
}

impl SensitivityParameter {
    pub const fn all() -> [Self; 4] {
        [
            Self::EnergyBurdenMultiplier,
            Self::IncomeThreshold,
            Self::ComplianceThreshold,
            Self::FundingLevel,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::EnergyBurdenMultiplier => "energy_burden_multiplier",
            Self::IncomeThreshold => "income_threshold",
            Self::ComplianceThreshold => "compliance_threshold",
            Self::FundingLevel => "funding_level",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::all()
            .into_iter()
            .find(|parameter| parameter.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityPoint {
    pub parameter: SensitivityParameter,
    pub value: f64,
    pub stats: AllocationStats,
}

/// Re-runs the base case once per value. Fractions that a multiplier pushes
/// past 1 are held at 1 so the adjusted table stays valid.
pub fn run_sensitivity(
    config: &AllocationConfig,
    table: &RegionTable,
    parameter: SensitivityParameter,
    values: &[f64],
) -> Result<Vec<SensitivityPoint>, AllocationError> {
    values
        .iter()
        .map(|&value| {
            let (config, table) = adjust(config, table, parameter, value)?;
            let outcome = AllocationEngine::new(config).allocate(&table, "Base Case")?;
            tracing::debug!(parameter = parameter.name(), value, "sensitivity point complete");
            Ok(SensitivityPoint {
                parameter,
                value,
                stats: AllocationStats::from_outcome(&outcome),
            })
        })
        .collect()
}

fn adjust(
    config: &AllocationConfig,
    table: &RegionTable,
    parameter: SensitivityParameter,
    value: f64,
) -> Result<(AllocationConfig, RegionTable), AllocationError> {
    let mut config = config.clone();
    let table = match parameter {
        SensitivityParameter::EnergyBurdenMultiplier => {
            table.map_rows(|row| row.energy_burden_pct = (row.energy_burden_pct * value).min(1.0))?
        }
        SensitivityParameter::IncomeThreshold => {
            table.map_rows(|row| row.median_income *= value)?
        }
        SensitivityParameter::ComplianceThreshold => {
            table.map_rows(|row| row.compliance_score = (row.compliance_score * value).min(1.0))?
        }
        SensitivityParameter::FundingLevel => {
            config.funding.available_for_allocation *= value;
            table.clone()
        }
    };
    Ok((config, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::spread_table;

    #[test]
    fn parameter_names_parse_case_insensitively() {
        assert_eq!(
            SensitivityParameter::from_name("Funding_Level"),
            Some(SensitivityParameter::FundingLevel)
        );
        assert_eq!(SensitivityParameter::from_name("poverty_weight"), None);
    }

    #[test]
    fn funding_level_scales_the_pool() {
        let points = run_sensitivity(
            &AllocationConfig::default(),
            &spread_table(),
            SensitivityParameter::FundingLevel,
            &[0.8, 1.0, 1.2],
        )
        .expect("sweep succeeds");

        assert_eq!(points.len(), 3);
        assert!((points[0].stats.total_allocation - 5_168_000.0).abs() < 100.0);
        assert!((points[2].stats.total_allocation - 7_752_000.0).abs() < 100.0);
        assert!(points[0].stats.households_served_total < points[2].stats.households_served_total);
    }

    #[test]
    fn input_multipliers_conserve_the_pool() {
        for parameter in [
            SensitivityParameter::EnergyBurdenMultiplier,
            SensitivityParameter::IncomeThreshold,
            SensitivityParameter::ComplianceThreshold,
        ] {
            let points = run_sensitivity(
                &AllocationConfig::default(),
                &spread_table(),
                parameter,
                &[0.9, 1.3],
            )
            .expect("sweep succeeds");
            for point in points {
                assert!(
                    (point.stats.total_allocation - 6_460_000.0).abs() < 100.0,
                    "{} at {}",
                    parameter.name(),
                    point.value
                );
            }
        }
    }

    #[test]
    fn negative_multiplier_fails_validation() {
        let error = run_sensitivity(
            &AllocationConfig::default(),
            &spread_table(),
            SensitivityParameter::IncomeThreshold,
            &[-1.0],
        )
        .expect_err("negative incomes are rejected");
        assert!(matches!(error, AllocationError::Validation(_)));
    }
}
