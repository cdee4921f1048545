use serde::Serialize;
use std::fmt;

/// Recoverable conditions encountered during a run. Each one is also logged
/// at warn level when it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationDiagnostic {
    /// Criterion was constant across regions; every region scored 0.5.
    DegenerateCriterion { column: &'static str },
    /// Composite scores summed to zero or less; the pool was split equally.
    EqualSplitFallback { composite_total: f64 },
    /// Iteration budget ran out before the pool was conserved.
    RedistributionNotConverged { iterations: usize, residual: f64 },
    /// A derived ratio had a zero denominator and was left undefined.
    UndefinedRatio {
        region_id: String,
        column: &'static str,
    },
}

impl fmt::Display for AllocationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationDiagnostic::DegenerateCriterion { column } => {
                write!(f, "{column} is constant across regions; neutral score used")
            }
            AllocationDiagnostic::EqualSplitFallback { composite_total } => write!(
                f,
                "composite scores total {composite_total}; funding split equally"
            ),
            AllocationDiagnostic::RedistributionNotConverged {
                iterations,
                residual,
            } => write!(
                f,
                "redistribution stopped after {iterations} iterations, {residual:.2} from the pool total"
            ),
            AllocationDiagnostic::UndefinedRatio { region_id, column } => {
                write!(f, "{column} undefined for {region_id} (zero denominator)")
            }
        }
    }
}
