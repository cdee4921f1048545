use fund_allocation::allocation::distribution::{apply_bounds, initial_allocations};
use fund_allocation::allocation::metrics::finalize;
use fund_allocation::allocation::redistribution::redistribute;
use fund_allocation::allocation::{
    AllocationBounds, AllocationDiagnostic, AllocationEngine, AllocationError, RegionRecord,
    Scenario, NEUTRAL_SCORE,
};
use fund_allocation::config::{
    AllocationConfig, AllocationConfigError, CriterionWeights, RedistributionConfig,
};
use fund_allocation::regions::RegionTable;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn region(index: usize) -> RegionRecord {
    RegionRecord {
        region_id: format!("REG_{index:03}"),
        region_name: format!("Region {index}"),
        total_population: 120_000.0,
        low_income_population: 24_000.0,
        poverty_rate: 0.18,
        median_income: 41_000.0,
        energy_burden_pct: 0.14,
        households_served: 2_100.0,
        avg_benefit: 360.0,
        compliance_score: 0.91,
        utilization_rate: 0.86,
        seniors_65_plus: 19_000.0,
        disabled_population: 12_000.0,
        children_under_18: 27_000.0,
    }
}

fn random_table(rng: &mut SmallRng, count: usize) -> RegionTable {
    let rows = (0..count)
        .map(|index| {
            let mut row = region(index);
            row.total_population = rng.gen_range(20_000.0..700_000.0);
            row.low_income_population = row.total_population * rng.gen_range(0.1..0.4);
            row.poverty_rate = rng.gen_range(0.08..0.32);
            row.median_income = rng.gen_range(28_000.0..78_000.0);
            row.energy_burden_pct = rng.gen_range(0.04..0.22);
            row.households_served = rng.gen_range(300.0..9_000.0);
            row.avg_benefit = rng.gen_range(250.0..600.0);
            row.compliance_score = rng.gen_range(0.7..1.0);
            row.utilization_rate = rng.gen_range(0.6..0.98);
            row.seniors_65_plus = row.total_population * rng.gen_range(0.10..0.22);
            row.disabled_population = row.total_population * rng.gen_range(0.08..0.16);
            row.children_under_18 = row.total_population * rng.gen_range(0.18..0.26);
            row
        })
        .collect();
    RegionTable::new(rows).expect("generated table is valid")
}

fn graded_table(count: usize) -> RegionTable {
    let rows = (0..count)
        .map(|index| {
            let step = index as f64;
            let mut row = region(index);
            row.median_income = 31_000.0 + 2_500.0 * step;
            row.energy_burden_pct = 0.07 + 0.012 * step;
            row.poverty_rate = 0.26 - 0.01 * step;
            row.utilization_rate = 0.74 + 0.015 * step;
            row.compliance_score = 0.80 + 0.012 * step;
            row.children_under_18 = 20_000.0 + 1_000.0 * step;
            row
        })
        .collect();
    RegionTable::new(rows).expect("graded table is valid")
}

#[test]
fn allocations_conserve_the_pool_and_respect_bounds() {
    let mut rng = SmallRng::seed_from_u64(2024);
    let config = AllocationConfig::default();
    let engine = AllocationEngine::new(config.clone());
    let floor = config.funding.floor_amount();
    let cap = config.funding.cap_amount();

    // Region counts well inside floor*n <= 1 <= cap*n for the 4% floor and 22% cap.
    for _ in 0..20 {
        let count = rng.gen_range(8..=20);
        let table = random_table(&mut rng, count);
        for scenario in Scenario::ordered() {
            let outcome = engine
                .allocate(&table, scenario.label())
                .expect("allocation succeeds");
            assert!(outcome.redistribution.converged, "{}", scenario.label());

            let total: f64 = outcome.final_allocations().iter().sum();
            assert!(
                (total - config.funding.available_for_allocation).abs() < 100.0,
                "{} regions, {}: total {total}",
                count,
                scenario.label()
            );
            for amount in outcome.final_allocations() {
                assert!(amount >= floor - 1e-6 && amount <= cap + 1e-6);
            }
        }
    }
}

#[test]
fn region_counts_beyond_the_floor_budget_are_rejected() {
    let mut rng = SmallRng::seed_from_u64(2024);
    let engine = AllocationEngine::new(AllocationConfig::default());

    for count in [26, 30, 40] {
        let table = random_table(&mut rng, count);
        let error = engine
            .allocate(&table, "Base Case")
            .expect_err("floors exceed the pool");
        assert!(matches!(
            error,
            AllocationError::Config(AllocationConfigError::InfeasibleBounds { n_regions, .. })
                if n_regions == count
        ));
    }
}

#[test]
fn raising_energy_burden_never_lowers_composite_score() {
    let engine = AllocationEngine::new(AllocationConfig::default());
    let base = graded_table(12);
    let target = "REG_005";

    let before = engine.allocate(&base, "Base Case").expect("base run");
    let burdened = base
        .map_rows(|row| {
            if row.region_id == target {
                row.energy_burden_pct += 0.05;
            }
        })
        .expect("still valid");
    let after = engine.allocate(&burdened, "Base Case").expect("burdened run");

    let score = |outcome: &fund_allocation::AllocationOutcome| {
        outcome
            .rows
            .iter()
            .find(|row| row.region.region_id == target)
            .map(|row| row.composite.composite_score)
            .expect("region present")
    };
    assert!(score(&after) >= score(&before));
}

#[test]
fn constant_criterion_scores_exactly_neutral() {
    let engine = AllocationEngine::new(AllocationConfig::default());
    let table = graded_table(12)
        .map_rows(|row| row.poverty_rate = 0.2)
        .expect("valid");
    let outcome = engine.allocate(&table, "Base Case").expect("allocation succeeds");

    assert!(outcome
        .rows
        .iter()
        .all(|row| row.scores.poverty_score == NEUTRAL_SCORE));
    assert!(outcome
        .diagnostics
        .contains(&AllocationDiagnostic::DegenerateCriterion {
            column: "poverty_score"
        }));
}

#[test]
fn zero_composite_scores_split_the_pool_equally() {
    let config = AllocationConfig {
        weights: CriterionWeights {
            income_level: 0.0,
            energy_burden: 0.0,
            poverty_rate: 0.0,
            vulnerable_population: 0.0,
            prior_utilization: 0.0,
            compliance_score: 0.0,
        },
        ..AllocationConfig::default()
    };
    let outcome = AllocationEngine::new(config)
        .allocate(&graded_table(10), "Base Case")
        .expect("allocation succeeds");

    let expected = 6_460_000.0 / 10.0;
    for row in &outcome.rows {
        assert!((row.bounded.initial_allocation - expected).abs() < 1e-6);
    }
    assert!(outcome
        .diagnostics
        .iter()
        .any(|diagnostic| matches!(diagnostic, AllocationDiagnostic::EqualSplitFallback { .. })));
}

#[test]
fn finalizing_twice_yields_identical_metrics() {
    let engine = AllocationEngine::new(AllocationConfig::default());
    let table = graded_table(12);
    let outcome = engine.allocate(&table, "Pessimistic").expect("allocation succeeds");

    let composites: Vec<_> = outcome.rows.iter().map(|row| row.composite).collect();
    let allocations = outcome.final_allocations();
    let first = finalize(table.rows(), &composites, &allocations, &mut Vec::new());
    let second = finalize(table.rows(), &composites, &allocations, &mut Vec::new());

    assert_eq!(first, second);
    let from_engine: Vec<_> = outcome.rows.iter().map(|row| row.metrics.clone()).collect();
    assert_eq!(first, from_engine);
}

#[test]
fn runs_are_deterministic_and_unknown_scenarios_use_base_case() {
    let engine = AllocationEngine::new(AllocationConfig::default());
    let table = graded_table(12);

    let first = engine.allocate(&table, "Optimistic").expect("first run");
    let second = engine.allocate(&table, "Optimistic").expect("second run");
    assert_eq!(first, second);

    let base = engine.allocate(&table, "Base Case").expect("base run");
    let unknown = engine.allocate(&table, "Status Quo").expect("unknown run");
    assert_eq!(base.rows, unknown.rows);
    assert_eq!(unknown.scenario, Scenario::BaseCase);
}

#[test]
fn three_region_example_converges_without_rescaling() {
    let total_funding = 1_000_000.0;
    let bounds = AllocationBounds {
        floor: 200_000.0,
        cap: 500_000.0,
    };
    let mut diagnostics = Vec::new();

    let initial = initial_allocations(&[0.1, 0.3, 0.6], total_funding, &mut diagnostics);
    let bounded = apply_bounds(&initial, bounds);
    let constrained: Vec<f64> = bounded
        .iter()
        .map(|row| row.constrained_allocation)
        .collect();
    assert_eq!(constrained, vec![200_000.0, 300_000.0, 500_000.0]);
    assert!(bounded[0].floor_violation);
    assert!(bounded[2].cap_violation);

    let solved = redistribute(
        &constrained,
        total_funding,
        bounds,
        RedistributionConfig::default(),
        &mut diagnostics,
    );
    assert!(solved.converged);
    assert_eq!(solved.iterations, 1);
    assert_eq!(solved.allocations, constrained);
    assert!(diagnostics.is_empty());
}

#[test]
fn three_region_engine_run_uses_configured_bounds() {
    let mut config = AllocationConfig::default();
    config.funding.available_for_allocation = 1_000_000.0;
    config.funding.minimum_floor = 0.20;
    config.funding.maximum_cap = 0.50;

    let outcome = AllocationEngine::new(config)
        .allocate(&graded_table(3), "Base Case")
        .expect("allocation succeeds");

    assert_eq!(outcome.redistribution.floor_amount, 200_000.0);
    assert_eq!(outcome.redistribution.cap_amount, 500_000.0);
    let total: f64 = outcome.final_allocations().iter().sum();
    assert!((total - 1_000_000.0).abs() < 100.0);
}

#[test]
fn exhausted_iteration_budget_is_reported_not_raised() {
    let mut config = AllocationConfig::default();
    // A tight cap forces clipping, so one pass cannot conserve the pool.
    config.funding.maximum_cap = 0.09;
    config.redistribution = RedistributionConfig {
        tolerance: 100.0,
        max_iterations: 1,
    };
    let table = graded_table(12)
        .map_rows(|row| {
            if row.region_id == "REG_000" {
                row.median_income = 9_000.0;
                row.energy_burden_pct = 0.40;
            }
        })
        .expect("valid");

    let outcome = AllocationEngine::new(config)
        .allocate(&table, "Equity-Focused")
        .expect("allocation returns best effort");

    assert!(!outcome.redistribution.converged);
    assert_eq!(outcome.redistribution.iterations, 1);
    assert!(outcome.redistribution.residual >= 100.0);
    assert!(outcome
        .rows
        .iter()
        .all(|row| row.redistribution_iterations == 1));
    assert!(outcome.diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        AllocationDiagnostic::RedistributionNotConverged { iterations: 1, .. }
    )));
}

#[test]
fn floors_consuming_the_whole_pool_return_best_effort() {
    let config = AllocationConfig::default();
    assert!(config.validate(25).is_ok());

    // 25 floors of $258,400 are exactly the $6.46M pool, so only the one
    // region above its floor can absorb each rescale.
    let total_funding = 6_460_000.0;
    let bounds = AllocationBounds {
        floor: 258_400.0,
        cap: 1_421_200.0,
    };
    let mut constrained = vec![bounds.floor; 25];
    constrained[0] += 50_000.0;
    let mut diagnostics = Vec::new();

    let solved = redistribute(
        &constrained,
        total_funding,
        bounds,
        RedistributionConfig::default(),
        &mut diagnostics,
    );

    assert!(!solved.converged);
    assert_eq!(solved.iterations, 100);
    assert!(solved.residual >= 100.0 && solved.residual < 50_000.0);
    assert!(solved
        .allocations
        .iter()
        .all(|&amount| amount >= bounds.floor && amount <= bounds.cap));
    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        AllocationDiagnostic::RedistributionNotConverged { iterations: 100, .. }
    )));

    let table = random_table(&mut SmallRng::seed_from_u64(25), 25);
    let outcome = AllocationEngine::new(config.clone())
        .allocate(&table, "Base Case")
        .expect("boundary table is accepted");
    let floor = config.funding.floor_amount();
    assert!(outcome
        .final_allocations()
        .iter()
        .all(|&amount| amount >= floor - 1e-6));
    assert_eq!(
        outcome.redistribution.converged,
        !outcome.diagnostics.iter().any(|diagnostic| matches!(
            diagnostic,
            AllocationDiagnostic::RedistributionNotConverged { .. }
        ))
    );
}

#[test]
fn invalid_rows_are_rejected_before_allocation() {
    let mut rows: Vec<_> = (0..10).map(region).collect();
    rows[3].total_population = -5.0;
    rows[7].poverty_rate = 1.4;

    let error = RegionTable::new(rows).expect_err("invalid rows");
    assert_eq!(error.issues.len(), 2);
    assert!(error.to_string().contains("REG_003"));

    let engine = AllocationEngine::new(AllocationConfig::default());
    let infeasible = engine
        .allocate(&graded_table(4), "Base Case")
        .expect_err("cap of 22% cannot cover four regions");
    assert!(matches!(infeasible, AllocationError::Config(_)));
}
