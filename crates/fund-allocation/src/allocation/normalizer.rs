use super::diagnostics::AllocationDiagnostic;
use super::domain::CriterionScores;
use crate::regions::RegionTable;

/// Score assigned to every region when a criterion does not vary.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Criteria that are standardized across the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Criterion {
    Income,
    EnergyBurden,
    Poverty,
    Utilization,
    VulnerablePopulation,
}

impl Criterion {
    pub(crate) const fn column(self) -> &'static str {
        match self {
            Self::Income => "income_score",
            Self::EnergyBurden => "energy_burden_score",
            Self::Poverty => "poverty_score",
            Self::Utilization => "utilization_score",
            Self::VulnerablePopulation => "vulnerable_score",
        }
    }
}

/// Converts raw inputs into [0, 1] sub-scores. Compliance is already a
/// fraction and passes through unchanged.
pub(crate) fn normalize(
    table: &RegionTable,
    diagnostics: &mut Vec<AllocationDiagnostic>,
) -> Vec<CriterionScores> {
    let rows = table.rows();
    let mut column = |criterion: Criterion| -> Vec<f64> {
        let raw: Vec<f64> = rows
            .iter()
            .map(|row| match criterion {
                Criterion::Income => row.median_income,
                Criterion::EnergyBurden => row.energy_burden_pct,
                Criterion::Poverty => row.poverty_rate,
                Criterion::Utilization => row.utilization_rate,
                Criterion::VulnerablePopulation => row.vulnerable_population_share(),
            })
            .collect();
        standardize(criterion, &raw, diagnostics)
    };

    let income = column(Criterion::Income);
    let energy = column(Criterion::EnergyBurden);
    let poverty = column(Criterion::Poverty);
    let utilization = column(Criterion::Utilization);
    let vulnerable = column(Criterion::VulnerablePopulation);

    rows.iter()
        .enumerate()
        .map(|(index, row)| CriterionScores {
            income_score: income[index],
            energy_burden_score: energy[index],
            poverty_score: poverty[index],
            utilization_score: utilization[index],
            compliance_score_norm: row.compliance_score,
            vulnerable_score: vulnerable[index],
        })
        .collect()
}

/// Z-score, then min-max rescale of the z-scores. Income is inverted between
/// the two passes so lower income scores higher.
fn standardize(
    criterion: Criterion,
    values: &[f64],
    diagnostics: &mut Vec<AllocationDiagnostic>,
) -> Vec<f64> {
    let Some(z_scores) = z_scores(values) else {
        tracing::warn!(
            column = criterion.column(),
            "criterion has no variation across regions, assigning neutral score"
        );
        diagnostics.push(AllocationDiagnostic::DegenerateCriterion {
            column: criterion.column(),
        });
        return vec![NEUTRAL_SCORE; values.len()];
    };

    let oriented: Vec<f64> = match criterion {
        Criterion::Income => z_scores.iter().map(|z| 1.0 - z).collect(),
        _ => z_scores,
    };

    rescale_unit(&oriented)
}

/// Standard scores using the sample standard deviation. `None` when the
/// values are constant (or too few to have a spread).
fn z_scores(values: &[f64]) -> Option<Vec<f64>> {
    let first = *values.first()?;
    if values.len() < 2 || values.iter().all(|value| *value == first) {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    let std_dev = variance.sqrt();
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return None;
    }

    Some(values.iter().map(|value| (value - mean) / std_dev).collect())
}

fn rescale_unit(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > min {
        values.iter().map(|value| (value - min) / (max - min)).collect()
    } else {
        vec![NEUTRAL_SCORE; values.len()]
    }
}
