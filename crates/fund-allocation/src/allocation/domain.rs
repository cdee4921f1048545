use serde::{Deserialize, Serialize};

/// One geographic unit of allocation, carrying the raw demographic and
/// program inputs exactly as supplied by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub region_id: String,
    pub region_name: String,
    pub total_population: f64,
    pub low_income_population: f64,
    pub poverty_rate: f64,
    pub median_income: f64,
    pub energy_burden_pct: f64,
    pub households_served: f64,
    pub avg_benefit: f64,
    pub compliance_score: f64,
    pub utilization_rate: f64,
    pub seniors_65_plus: f64,
    pub disabled_population: f64,
    pub children_under_18: f64,
}

impl RegionRecord {
    /// Share of the population that is senior, disabled, or under 18.
    /// Groups may overlap, so the value can exceed 1.0.
    pub fn vulnerable_population_share(&self) -> f64 {
        (self.seniors_65_plus + self.disabled_population + self.children_under_18)
            / self.total_population
    }

    pub(crate) fn numeric_fields(&self) -> [(&'static str, f64); 12] {
        [
            ("total_population", self.total_population),
            ("low_income_population", self.low_income_population),
            ("poverty_rate", self.poverty_rate),
            ("median_income", self.median_income),
            ("energy_burden_pct", self.energy_burden_pct),
            ("households_served", self.households_served),
            ("avg_benefit", self.avg_benefit),
            ("compliance_score", self.compliance_score),
            ("utilization_rate", self.utilization_rate),
            ("seniors_65_plus", self.seniors_65_plus),
            ("disabled_population", self.disabled_population),
            ("children_under_18", self.children_under_18),
        ]
    }
}

/// Per-criterion scores on a [0, 1] scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub income_score: f64,
    pub energy_burden_score: f64,
    pub poverty_score: f64,
    pub utilization_score: f64,
    pub compliance_score_norm: f64,
    pub vulnerable_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScores {
    pub need_score: f64,
    pub performance_score: f64,
    pub composite_score: f64,
}

/// Result of clipping a proportional allocation to the floor/cap bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedAllocation {
    pub initial_allocation: f64,
    pub constrained_allocation: f64,
    pub floor_violation: bool,
    pub cap_violation: bool,
}

/// Derived per-region metrics. Ratios are `None` when their denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    pub allocation_per_household: Option<f64>,
    pub benefit_increase_pct: Option<f64>,
    pub allocation_per_capita: Option<f64>,
    pub allocation_per_low_income: Option<f64>,
    pub expected_households_served: Option<f64>,
    pub utilization_projection: Option<f64>,
    pub allocation_rank: usize,
    pub need_rank: usize,
    pub performance_rank: usize,
    pub allocation_share: Option<f64>,
    pub population_share: Option<f64>,
    pub low_income_share: Option<f64>,
}

/// A region row augmented with every column the pipeline derives. Upstream
/// columns are flattened in so the serialized row is a single flat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedRegion {
    #[serde(flatten)]
    pub region: RegionRecord,
    #[serde(flatten)]
    pub scores: CriterionScores,
    #[serde(flatten)]
    pub multipliers: super::scenario::ScenarioMultipliers,
    #[serde(flatten)]
    pub composite: CompositeScores,
    #[serde(flatten)]
    pub bounded: BoundedAllocation,
    pub final_allocation: f64,
    pub redistribution_iterations: usize,
    #[serde(flatten)]
    pub metrics: RegionMetrics,
}
