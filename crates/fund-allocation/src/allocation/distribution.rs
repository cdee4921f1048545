use super::diagnostics::AllocationDiagnostic;
use super::domain::BoundedAllocation;

/// Per-region currency bounds derived from the floor and cap fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationBounds {
    pub floor: f64,
    pub cap: f64,
}

impl AllocationBounds {
    pub fn clip(&self, amount: f64) -> f64 {
        amount.max(self.floor).min(self.cap)
    }
}

/// Splits the pool in proportion to composite score, or equally when the
/// scores sum to zero or less.
pub fn initial_allocations(
    composite_scores: &[f64],
    total_funding: f64,
    diagnostics: &mut Vec<AllocationDiagnostic>,
) -> Vec<f64> {
    let composite_total: f64 = composite_scores.iter().sum();

    if composite_total > 0.0 {
        composite_scores
            .iter()
            .map(|score| (score / composite_total) * total_funding)
            .collect()
    } else {
        tracing::warn!(
            composite_total,
            "composite scores sum to zero, splitting funding equally"
        );
        diagnostics.push(AllocationDiagnostic::EqualSplitFallback { composite_total });
        let share = total_funding / composite_scores.len() as f64;
        vec![share; composite_scores.len()]
    }
}

/// Clips each allocation to the bounds and flags which side was violated.
pub fn apply_bounds(initial: &[f64], bounds: AllocationBounds) -> Vec<BoundedAllocation> {
    initial
        .iter()
        .map(|&amount| BoundedAllocation {
            initial_allocation: amount,
            constrained_allocation: bounds.clip(amount),
            floor_violation: amount < bounds.floor,
            cap_violation: amount > bounds.cap,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_split_follows_scores() {
        let mut diagnostics = Vec::new();
        let allocations = initial_allocations(&[0.1, 0.3, 0.6], 1_000_000.0, &mut diagnostics);

        assert!((allocations[0] - 100_000.0).abs() < 1e-6);
        assert!((allocations[1] - 300_000.0).abs() < 1e-6);
        assert!((allocations[2] - 600_000.0).abs() < 1e-6);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn zero_scores_split_equally() {
        let mut diagnostics = Vec::new();
        let allocations = initial_allocations(&[0.0; 4], 1_000_000.0, &mut diagnostics);

        assert_eq!(allocations, vec![250_000.0; 4]);
        assert_eq!(
            diagnostics,
            vec![AllocationDiagnostic::EqualSplitFallback {
                composite_total: 0.0
            }]
        );
    }

    #[test]
    fn bounds_clip_and_flag_violations() {
        let bounds = AllocationBounds {
            floor: 200_000.0,
            cap: 500_000.0,
        };
        let bounded = apply_bounds(&[100_000.0, 300_000.0, 600_000.0], bounds);

        assert_eq!(bounded[0].constrained_allocation, 200_000.0);
        assert!(bounded[0].floor_violation && !bounded[0].cap_violation);
        assert_eq!(bounded[1].constrained_allocation, 300_000.0);
        assert!(!bounded[1].floor_violation && !bounded[1].cap_violation);
        assert_eq!(bounded[2].constrained_allocation, 500_000.0);
        assert!(bounded[2].cap_violation);
        assert_eq!(bounded[2].initial_allocation, 600_000.0);
    }
}
