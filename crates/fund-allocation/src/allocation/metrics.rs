use super::diagnostics::AllocationDiagnostic;
use super::domain::{CompositeScores, RegionMetrics, RegionRecord};

/// Derives per-region ratios, ranks, and shares from the final allocation.
/// Pure: the same inputs always produce the same metrics.
pub fn finalize(
    regions: &[RegionRecord],
    composites: &[CompositeScores],
    final_allocations: &[f64],
    diagnostics: &mut Vec<AllocationDiagnostic>,
) -> Vec<RegionMetrics> {
    let allocation_ranks = dense_rank_descending(final_allocations);
    let need_ranks = dense_rank_descending(
        &composites
            .iter()
            .map(|scores| scores.need_score)
            .collect::<Vec<_>>(),
    );
    let performance_ranks = dense_rank_descending(
        &composites
            .iter()
            .map(|scores| scores.performance_score)
            .collect::<Vec<_>>(),
    );

    let allocation_total: f64 = final_allocations.iter().sum();
    let population_total: f64 = regions.iter().map(|row| row.total_population).sum();
    let low_income_total: f64 = regions.iter().map(|row| row.low_income_population).sum();

    regions
        .iter()
        .zip(final_allocations)
        .enumerate()
        .map(|(index, (row, &allocation))| {
            let mut ratio = |column: &'static str, numerator: f64, denominator: f64| {
                guarded_ratio(&row.region_id, column, numerator, denominator, diagnostics)
            };

            let allocation_per_household =
                ratio("allocation_per_household", allocation, row.households_served);
            let benefit_increase_pct = match allocation_per_household {
                Some(per_household) => ratio(
                    "benefit_increase_pct",
                    per_household - row.avg_benefit,
                    row.avg_benefit,
                )
                .map(|fraction| fraction * 100.0),
                None => None,
            };
            let allocation_per_capita =
                ratio("allocation_per_capita", allocation, row.total_population);
            let allocation_per_low_income = ratio(
                "allocation_per_low_income",
                allocation,
                row.low_income_population,
            );
            let expected_households_served =
                ratio("expected_households_served", allocation, row.avg_benefit);
            let utilization_projection = match expected_households_served {
                Some(expected) => ratio(
                    "utilization_projection",
                    expected,
                    row.low_income_population,
                ),
                None => None,
            };

            RegionMetrics {
                allocation_per_household,
                benefit_increase_pct,
                allocation_per_capita,
                allocation_per_low_income,
                expected_households_served,
                utilization_projection,
                allocation_rank: allocation_ranks[index],
                need_rank: need_ranks[index],
                performance_rank: performance_ranks[index],
                allocation_share: ratio("allocation_share", allocation, allocation_total),
                population_share: ratio(
                    "population_share",
                    row.total_population,
                    population_total,
                ),
                low_income_share: ratio(
                    "low_income_share",
                    row.low_income_population,
                    low_income_total,
                ),
            }
        })
        .collect()
}

fn guarded_ratio(
    region_id: &str,
    column: &'static str,
    numerator: f64,
    denominator: f64,
    diagnostics: &mut Vec<AllocationDiagnostic>,
) -> Option<f64> {
    if denominator == 0.0 {
        tracing::warn!(region_id, column, "zero denominator, metric left undefined");
        diagnostics.push(AllocationDiagnostic::UndefinedRatio {
            region_id: region_id.to_string(),
            column,
        });
        return None;
    }
    Some(numerator / denominator)
}

/// Dense rank, highest value first; equal values share a rank and the next
/// distinct value takes the following integer.
pub fn dense_rank_descending(values: &[f64]) -> Vec<usize> {
    let mut distinct: Vec<f64> = values.to_vec();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup();

    values
        .iter()
        .map(|value| {
            distinct
                .iter()
                .position(|candidate| candidate.total_cmp(value).is_eq())
                .map_or(0, |position| position + 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::tests::sample_record;

    fn composites(values: &[(f64, f64)]) -> Vec<CompositeScores> {
        values
            .iter()
            .map(|&(need_score, performance_score)| CompositeScores {
                need_score,
                performance_score,
                composite_score: 0.7 * need_score + 0.3 * performance_score,
            })
            .collect()
    }

    #[test]
    fn dense_rank_shares_ties() {
        assert_eq!(
            dense_rank_descending(&[10.0, 30.0, 30.0, 20.0]),
            vec![3, 1, 1, 2]
        );
        assert_eq!(dense_rank_descending(&[5.0]), vec![1]);
    }

    #[test]
    fn derives_ratios_and_shares() {
        let regions = vec![sample_record("REG_001", "Alpha"), sample_record("REG_002", "Beta")];
        let scores = composites(&[(0.5, 0.2), (0.4, 0.3)]);
        let mut diagnostics = Vec::new();
        let metrics = finalize(&regions, &scores, &[756_000.0, 252_000.0], &mut diagnostics);

        let first = &metrics[0];
        assert_eq!(first.allocation_per_household, Some(756_000.0 / 2_100.0));
        assert_eq!(first.allocation_per_capita, Some(756_000.0 / 120_000.0));
        assert_eq!(first.expected_households_served, Some(2_100.0));
        assert_eq!(first.utilization_projection, Some(2_100.0 / 24_000.0));
        assert!((first.benefit_increase_pct.expect("defined") - 0.0).abs() < 1e-9);
        assert_eq!(first.allocation_share, Some(0.75));
        assert_eq!(first.population_share, Some(0.5));
        assert_eq!(first.allocation_rank, 1);
        assert_eq!(first.need_rank, 1);
        assert_eq!(first.performance_rank, 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn zero_denominators_are_undefined_not_fatal() {
        let mut row = sample_record("REG_001", "Alpha");
        row.households_served = 0.0;
        row.low_income_population = 0.0;
        let mut diagnostics = Vec::new();
        let metrics = finalize(
            &[row],
            &composites(&[(0.5, 0.2)]),
            &[100_000.0],
            &mut diagnostics,
        );

        assert_eq!(metrics[0].allocation_per_household, None);
        assert_eq!(metrics[0].benefit_increase_pct, None);
        assert_eq!(metrics[0].allocation_per_low_income, None);
        assert_eq!(metrics[0].utilization_projection, None);
        assert_eq!(metrics[0].low_income_share, None);
        assert!(metrics[0].allocation_per_capita.is_some());
        assert!(diagnostics.contains(&AllocationDiagnostic::UndefinedRatio {
            region_id: "REG_001".to_string(),
            column: "allocation_per_household",
        }));
    }

    #[test]
    fn zero_column_totals_flag_every_share() {
        let regions: Vec<_> = ["REG_001", "REG_002", "REG_003"]
            .iter()
            .map(|id| {
                let mut row = sample_record(id, "Region");
                row.low_income_population = 0.0;
                row
            })
            .collect();
        let mut diagnostics = Vec::new();
        let metrics = finalize(
            &regions,
            &composites(&[(0.5, 0.2), (0.4, 0.3), (0.3, 0.1)]),
            &[300_000.0, 300_000.0, 400_000.0],
            &mut diagnostics,
        );

        for (row, metric) in regions.iter().zip(&metrics) {
            assert_eq!(metric.low_income_share, None);
            assert!(metric.population_share.is_some());
            assert!(diagnostics.contains(&AllocationDiagnostic::UndefinedRatio {
                region_id: row.region_id.clone(),
                column: "low_income_share",
            }));
        }
    }

    #[test]
    fn finalization_is_idempotent() {
        let regions = vec![sample_record("REG_001", "Alpha"), sample_record("REG_002", "Beta")];
        let scores = composites(&[(0.5, 0.2), (0.5, 0.3)]);
        let allocations = [400_000.0, 600_000.0];

        let first = finalize(&regions, &scores, &allocations, &mut Vec::new());
        let second = finalize(&regions, &scores, &allocations, &mut Vec::new());
        assert_eq!(first, second);
        assert_eq!(first[0].need_rank, first[1].need_rank);
    }
}
