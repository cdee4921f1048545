//! Rescale-and-clip redistribution.
//!
//! Starting from the clipped allocations, the solver repeatedly scales every
//! region by `total_funding / current_total` and re-clips to the bounds until
//! the allocations sum to the pool within `tolerance` or the iteration budget
//! runs out. This is a heuristic, not an exact projection onto the
//! bounded simplex: when many regions are pinned at the floor or cap only the
//! free regions absorb each correction, so convergence can be slow or stall.
//! Running out of iterations is not an error; the last vector is returned.

use super::diagnostics::AllocationDiagnostic;
use super::distribution::AllocationBounds;
use crate::config::RedistributionConfig;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Redistribution {
    pub allocations: Vec<f64>,
    /// 1-indexed count of iterations used, including the converging check.
    pub iterations: usize,
    pub converged: bool,
    /// `|Σ allocations - total_funding|` after the final iteration.
    pub residual: f64,
}

pub fn redistribute(
    constrained: &[f64],
    total_funding: f64,
    bounds: AllocationBounds,
    policy: RedistributionConfig,
    diagnostics: &mut Vec<AllocationDiagnostic>,
) -> Redistribution {
    let mut allocations = constrained.to_vec();
    let mut iteration = 0;
    let mut converged = false;

    for step in 0..policy.max_iterations {
        iteration = step;
        let current_total: f64 = allocations.iter().sum();

        if (current_total - total_funding).abs() < policy.tolerance {
            converged = true;
            break;
        }

        if current_total <= 0.0 {
            tracing::warn!(current_total, "allocations sum to zero, cannot rescale");
            break;
        }

        let adjustment = total_funding / current_total;
        for amount in allocations.iter_mut() {
            *amount = bounds.clip(*amount * adjustment);
        }

        tracing::trace!(iteration = step + 1, adjustment, "redistribution pass");
    }

    let iterations = iteration + 1;
    let residual = (allocations.iter().sum::<f64>() - total_funding).abs();

    if !converged {
        tracing::warn!(
            iterations,
            residual,
            "max iterations reached in redistribution"
        );
        diagnostics.push(AllocationDiagnostic::RedistributionNotConverged {
            iterations,
            residual,
        });
    } else {
        tracing::debug!(iterations, residual, "redistribution converged");
    }

    Redistribution {
        allocations,
        iterations,
        converged,
        residual,
    }
}
