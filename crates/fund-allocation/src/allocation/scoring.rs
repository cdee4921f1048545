use super::domain::{CompositeScores, CriterionScores};
use super::scenario::ScenarioMultipliers;
use crate::config::CriterionWeights;

/// Share of the composite score taken by the need score.
pub const NEED_SHARE: f64 = 0.7;
/// Share of the composite score taken by the performance score.
pub const PERFORMANCE_SHARE: f64 = 0.3;

/// Combines sub-scores into need, performance, and composite scores.
///
/// The 0.7/0.3 split is applied on top of weights that already default to a
/// 0.70/0.30 split, so the two groups compound.
pub(crate) fn score(
    scores: &CriterionScores,
    weights: &CriterionWeights,
    multipliers: &ScenarioMultipliers,
) -> CompositeScores {
    let need_score = weights.income_level * scores.income_score * multipliers.income
        + weights.energy_burden * scores.energy_burden_score * multipliers.energy_burden
        + weights.poverty_rate * scores.poverty_score * multipliers.poverty
        + weights.vulnerable_population * scores.vulnerable_score;

    let performance_score =
        weights.prior_utilization * scores.utilization_score * multipliers.performance
            + weights.compliance_score * scores.compliance_score_norm * multipliers.performance;

    CompositeScores {
        need_score,
        performance_score,
        composite_score: NEED_SHARE * need_score + PERFORMANCE_SHARE * performance_score,
    }
}
