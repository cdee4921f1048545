//! Monte Carlo uncertainty analysis.
//!
//! Each simulation perturbs a copy of the table with noise drawn from its own
//! RNG, seeded from the run seed and the simulation index, then runs the
//! engine. Results therefore depend only on `(seed, index)`, never on how
//! simulations were spread over worker threads.

use crate::allocation::{AllocationEngine, AllocationError, RegionRecord};
use crate::equity::indices;
use crate::regions::RegionTable;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Uniform};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseDistribution {
    /// Zero-mean Gaussian with the factor's standard deviation.
    Normal,
    /// Uniform on `[-std_dev, std_dev)`.
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerturbedColumn {
    PovertyRate,
    EnergyBurdenPct,
    MedianIncome,
    ComplianceScore,
    HouseholdsServed,
}

impl PerturbedColumn {
    /// Range the perturbed value is clipped to.
    pub const fn bounds(self) -> (f64, f64) {
        match self {
            Self::PovertyRate => (0.02, 0.50),
            Self::EnergyBurdenPct => (0.02, 0.60),
            Self::MedianIncome => (0.0, f64::INFINITY),
            Self::ComplianceScore => (0.5, 1.0),
            Self::HouseholdsServed => (100.0, f64::INFINITY),
        }
    }

    fn value_mut(self, row: &mut RegionRecord) -> &mut f64 {
        match self {
            Self::PovertyRate => &mut row.poverty_rate,
            Self::EnergyBurdenPct => &mut row.energy_burden_pct,
            Self::MedianIncome => &mut row.median_income,
            Self::ComplianceScore => &mut row.compliance_score,
            Self::HouseholdsServed => &mut row.households_served,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UncertaintyFactor {
    pub column: PerturbedColumn,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloConfig {
    pub simulations: usize,
    pub seed: u64,
    /// Worker threads; defaults to the available parallelism.
    pub workers: Option<NonZeroUsize>,
    pub scenario: String,
    pub distribution: NoiseDistribution,
    pub factors: Vec<UncertaintyFactor>,
    pub shortfall_threshold: f64,
    pub surplus_threshold: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            simulations: 1_000,
            seed: 42,
            workers: None,
            scenario: "Base Case".to_string(),
            distribution: NoiseDistribution::Normal,
            factors: vec![
                UncertaintyFactor {
                    column: PerturbedColumn::PovertyRate,
                    std_dev: 0.05,
                },
                UncertaintyFactor {
                    column: PerturbedColumn::EnergyBurdenPct,
                    std_dev: 0.08,
                },
                UncertaintyFactor {
                    column: PerturbedColumn::MedianIncome,
                    std_dev: 5_000.0,
                },
                UncertaintyFactor {
                    column: PerturbedColumn::ComplianceScore,
                    std_dev: 0.08,
                },
                UncertaintyFactor {
                    column: PerturbedColumn::HouseholdsServed,
                    std_dev: 200.0,
                },
            ],
            shortfall_threshold: 6_000_000.0,
            surplus_threshold: 7_000_000.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonteCarloError {
    #[error("at least one simulation is required")]
    NoSimulations,
    #[error("noise for {column:?} needs a finite, non-negative std_dev (got {std_dev})")]
    InvalidNoise { column: PerturbedColumn, std_dev: f64 },
    #[error("simulation {simulation_id} failed: {source}")]
    Simulation {
        simulation_id: usize,
        #[source]
        source: AllocationError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub simulation_id: usize,
    pub total_allocation: f64,
    pub mean_allocation: f64,
    pub coefficient_variation: f64,
    pub min_allocation: f64,
    pub max_allocation: f64,
    pub households_served: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloStatistics {
    pub mean_total_allocation: f64,
    pub std_total_allocation: f64,
    pub ci_95_lower_total: f64,
    pub ci_95_upper_total: f64,
    pub mean_households_served: f64,
    pub std_households_served: f64,
    pub probability_shortfall: f64,
    pub probability_surplus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloReport {
    pub n_simulations: usize,
    pub seed: u64,
    pub statistics: MonteCarloStatistics,
    pub simulations: Vec<SimulationResult>,
}

/// Derives the RNG seed for one simulation (SplitMix64 finalizer).
pub fn simulation_seed(seed: u64, simulation_id: usize) -> u64 {
    let mut z = seed.wrapping_add((simulation_id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

enum Noise {
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
    Zero,
}

impl Noise {
    fn sample(&self, rng: &mut SmallRng) -> f64 {
        match self {
            Self::Normal(normal) => normal.sample(rng),
            Self::Uniform(uniform) => uniform.sample(rng),
            Self::Zero => 0.0,
        }
    }
}

fn build_noise(
    distribution: NoiseDistribution,
    factor: &UncertaintyFactor,
) -> Result<Noise, MonteCarloError> {
    let invalid = || MonteCarloError::InvalidNoise {
        column: factor.column,
        std_dev: factor.std_dev,
    };
    if !factor.std_dev.is_finite() || factor.std_dev < 0.0 {
        return Err(invalid());
    }
    if factor.std_dev == 0.0 {
        return Ok(Noise::Zero);
    }
    match distribution {
        NoiseDistribution::Normal => Normal::new(0.0, factor.std_dev)
            .map(Noise::Normal)
            .map_err(|_| invalid()),
        NoiseDistribution::Uniform => Ok(Noise::Uniform(Uniform::new(
            -factor.std_dev,
            factor.std_dev,
        ))),
    }
}

pub fn run_monte_carlo(
    engine: &AllocationEngine,
    table: &RegionTable,
    config: &MonteCarloConfig,
) -> Result<MonteCarloReport, MonteCarloError> {
    if config.simulations == 0 {
        return Err(MonteCarloError::NoSimulations);
    }
    let noise = config
        .factors
        .iter()
        .map(|factor| Ok((factor.column, build_noise(config.distribution, factor)?)))
        .collect::<Result<Vec<_>, MonteCarloError>>()?;

    let workers = config
        .workers
        .or_else(|| std::thread::available_parallelism().ok())
        .map_or(1, NonZeroUsize::get)
        .min(config.simulations);
    tracing::info!(
        simulations = config.simulations,
        workers,
        seed = config.seed,
        "starting monte carlo run"
    );

    let next = AtomicUsize::new(0);
    let mut outcomes: Vec<(usize, Result<SimulationResult, AllocationError>)> =
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut completed = Vec::new();
                        loop {
                            let simulation_id = next.fetch_add(1, Ordering::Relaxed);
                            if simulation_id >= config.simulations {
                                break;
                            }
                            completed.push((
                                simulation_id,
                                simulate(engine, table, config, &noise, simulation_id),
                            ));
                        }
                        completed
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(completed) => completed,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
    outcomes.sort_by_key(|(simulation_id, _)| *simulation_id);

    let simulations = outcomes
        .into_iter()
        .map(|(simulation_id, result)| {
            result.map_err(|source| MonteCarloError::Simulation {
                simulation_id,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let statistics = summarize(&simulations, config);
    tracing::info!(
        mean_total_allocation = statistics.mean_total_allocation,
        probability_shortfall = statistics.probability_shortfall,
        "monte carlo run complete"
    );

    Ok(MonteCarloReport {
        n_simulations: config.simulations,
        seed: config.seed,
        statistics,
        simulations,
    })
}

fn simulate(
    engine: &AllocationEngine,
    table: &RegionTable,
    config: &MonteCarloConfig,
    noise: &[(PerturbedColumn, Noise)],
    simulation_id: usize,
) -> Result<SimulationResult, AllocationError> {
    let mut rng = SmallRng::seed_from_u64(simulation_seed(config.seed, simulation_id));
    let perturbed = table.map_rows(|row| {
        for (column, noise) in noise {
            let (low, high) = column.bounds();
            let value = column.value_mut(row);
            *value = (*value + noise.sample(&mut rng)).clamp(low, high);
        }
    })?;

    let outcome = engine.allocate(&perturbed, &config.scenario)?;
    let stats = super::AllocationStats::from_outcome(&outcome);
    tracing::trace!(simulation_id, total = stats.total_allocation, "simulation complete");

    Ok(SimulationResult {
        simulation_id,
        total_allocation: stats.total_allocation,
        mean_allocation: stats.mean_allocation,
        coefficient_variation: stats.coefficient_variation,
        min_allocation: stats.min_allocation,
        max_allocation: stats.max_allocation,
        households_served: stats.households_served_total,
    })
}

fn summarize(simulations: &[SimulationResult], config: &MonteCarloConfig) -> MonteCarloStatistics {
    let totals: Vec<f64> = simulations.iter().map(|run| run.total_allocation).collect();
    let households: Vec<f64> = simulations.iter().map(|run| run.households_served).collect();
    let count = totals.len() as f64;
    let fraction = |predicate: &dyn Fn(f64) -> bool| {
        totals.iter().filter(|&&total| predicate(total)).count() as f64 / count
    };

    MonteCarloStatistics {
        mean_total_allocation: indices::mean(&totals).unwrap_or(0.0),
        std_total_allocation: indices::std_dev(&totals).unwrap_or(0.0),
        ci_95_lower_total: quantile(&totals, 0.025),
        ci_95_upper_total: quantile(&totals, 0.975),
        mean_households_served: indices::mean(&households).unwrap_or(0.0),
        std_households_served: indices::std_dev(&households).unwrap_or(0.0),
        probability_shortfall: fraction(&|total| total < config.shortfall_threshold),
        probability_surplus: fraction(&|total| total > config.surplus_threshold),
    }
}

/// Quantile with linear interpolation between closest ranks.
pub(crate) fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
