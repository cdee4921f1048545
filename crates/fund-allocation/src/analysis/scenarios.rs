use super::AllocationStats;
use crate::allocation::{AllocationEngine, AllocationError, AllocationOutcome, Scenario};
use crate::equity::EquitySummary;
use crate::regions::RegionTable;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub scenario: Scenario,
    pub stats: AllocationStats,
    pub equity: EquitySummary,
    pub iterations: usize,
    pub converged: bool,
    #[serde(skip)]
    pub outcome: AllocationOutcome,
}

/// Runs every scenario in `scenarios` (all named scenarios when empty)
/// against the same table. Runs share nothing, so the order of the result
/// follows the order requested.
pub fn compare_scenarios(
    engine: &AllocationEngine,
    table: &RegionTable,
    scenarios: &[Scenario],
) -> Result<Vec<ScenarioComparison>, AllocationError> {
    let all = Scenario::ordered();
    let requested = if scenarios.is_empty() {
        &all[..]
    } else {
        scenarios
    };

    requested
        .iter()
        .map(|scenario| {
            let outcome = engine.allocate(table, scenario.label())?;
            Ok(ScenarioComparison {
                scenario: *scenario,
                stats: AllocationStats::from_outcome(&outcome),
                equity: EquitySummary::from_outcome(&outcome, &engine.config().equity),
                iterations: outcome.redistribution.iterations,
                converged: outcome.redistribution.converged,
                outcome,
            })
        })
        .collect()
}
