use crate::infra::{allocation_config, parse_parameter};
use clap::Args;
use fund_allocation::allocation::{AllocationEngine, AllocationOutcome};
use fund_allocation::analysis::{
    self, AllocationStats, MonteCarloConfig, MonteCarloReport, NoiseDistribution,
    ScenarioComparison, SensitivityParameter, SensitivityPoint, VariantRun,
};
use fund_allocation::config::{AllocationConfig, AppConfig};
use fund_allocation::equity::EquitySummary;
use fund_allocation::error::AppError;
use fund_allocation::regions::RegionTable;
use fund_allocation::telemetry;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct InputArgs {
    /// Region table CSV with one row per region
    #[arg(long)]
    pub(crate) regions: PathBuf,
    /// JSON allocation configuration (defaults to ALLOCATION_CONFIG, then built-in defaults)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Print machine-readable JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// Scenario label; unrecognized labels run as the base case
    #[arg(long, default_value = "Base Case")]
    pub(crate) scenario: String,
}

#[derive(Args, Debug)]
pub(crate) struct ScenariosArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
}

#[derive(Args, Debug)]
pub(crate) struct VariantsArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    #[arg(long, default_value = "Base Case")]
    pub(crate) scenario: String,
}

#[derive(Args, Debug)]
pub(crate) struct SensitivityArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// energy_burden_multiplier, income_threshold, compliance_threshold or funding_level
    #[arg(long, value_parser = parse_parameter)]
    pub(crate) parameter: SensitivityParameter,
    /// Comma-separated multipliers, e.g. 0.8,1.0,1.2
    #[arg(long, value_delimiter = ',', required = true)]
    pub(crate) values: Vec<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct MonteCarloArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// Number of simulations
    #[arg(long, default_value_t = 1_000)]
    pub(crate) simulations: usize,
    /// Seed for the simulation RNGs
    #[arg(long, default_value_t = 42)]
    pub(crate) seed: u64,
    /// Worker threads (defaults to available parallelism)
    #[arg(long)]
    pub(crate) workers: Option<NonZeroUsize>,
    /// Draw uniform rather than Gaussian noise
    #[arg(long)]
    pub(crate) uniform: bool,
    #[arg(long, default_value = "Base Case")]
    pub(crate) scenario: String,
}

struct Prepared {
    config: AllocationConfig,
    table: RegionTable,
    json: bool,
}

fn prepare(input: &InputArgs) -> Result<Prepared, AppError> {
    let app_config = AppConfig::load()?;
    telemetry::init(&app_config.telemetry)?;

    let config = allocation_config(input.config.as_deref(), app_config.allocation)?;
    let table = load_table(&input.regions)?;
    Ok(Prepared {
        config,
        table,
        json: input.json,
    })
}

pub(crate) fn load_table(path: &Path) -> Result<RegionTable, AppError> {
    let table = RegionTable::from_path(path)?;
    tracing::info!(path = %path.display(), regions = table.len(), "region table loaded");
    Ok(table)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    println!("{rendered}");
    Ok(())
}

#[derive(Serialize)]
struct AllocationReport<'a> {
    #[serde(flatten)]
    outcome: &'a AllocationOutcome,
    equity: &'a EquitySummary,
}

pub(crate) fn run_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let prepared = prepare(&args.input)?;
    let outcome = AllocationEngine::new(prepared.config.clone())
        .allocate(&prepared.table, &args.scenario)?;
    let equity = EquitySummary::from_outcome(&outcome, &prepared.config.equity);

    if prepared.json {
        return print_json(&AllocationReport {
            outcome: &outcome,
            equity: &equity,
        });
    }
    render_allocation(&outcome, &equity);
    Ok(())
}

pub(crate) fn run_scenarios(args: ScenariosArgs) -> Result<(), AppError> {
    let prepared = prepare(&args.input)?;
    let engine = AllocationEngine::new(prepared.config);
    let comparisons = analysis::compare_scenarios(&engine, &prepared.table, &[])?;

    if prepared.json {
        return print_json(&comparisons);
    }
    render_scenarios(&comparisons);
    Ok(())
}

pub(crate) fn run_variants(args: VariantsArgs) -> Result<(), AppError> {
    let prepared = prepare(&args.input)?;
    let runs = analysis::run_variants(&prepared.config, &prepared.table, &args.scenario)?;

    if prepared.json {
        return print_json(&runs);
    }
    render_variants(&runs);
    Ok(())
}

pub(crate) fn run_sensitivity(args: SensitivityArgs) -> Result<(), AppError> {
    let prepared = prepare(&args.input)?;
    let points = analysis::run_sensitivity(
        &prepared.config,
        &prepared.table,
        args.parameter,
        &args.values,
    )?;

    if prepared.json {
        return print_json(&points);
    }
    render_sensitivity(args.parameter, &points);
    Ok(())
}

pub(crate) fn run_monte_carlo(args: MonteCarloArgs) -> Result<(), AppError> {
    let prepared = prepare(&args.input)?;
    let config = MonteCarloConfig {
        simulations: args.simulations,
        seed: args.seed,
        workers: args.workers,
        scenario: args.scenario,
        distribution: if args.uniform {
            NoiseDistribution::Uniform
        } else {
            NoiseDistribution::Normal
        },
        ..MonteCarloConfig::default()
    };
    let engine = AllocationEngine::new(prepared.config);
    let report = analysis::run_monte_carlo(&engine, &prepared.table, &config)?;

    if prepared.json {
        return print_json(&report);
    }
    render_monte_carlo(&report);
    Ok(())
}

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{value:.precision$}"),
        None => "n/a".to_string(),
    }
}

fn render_allocation(outcome: &AllocationOutcome, equity: &EquitySummary) {
    let summary = &outcome.redistribution;
    println!("Allocation: {}", outcome.scenario.label());
    if outcome.requested_scenario != outcome.scenario.label() {
        println!(
            "  (requested '{}', not a named scenario)",
            outcome.requested_scenario
        );
    }
    println!(
        "Pool ${:.0}  floor ${:.0}  cap ${:.0}",
        summary.total_funding, summary.floor_amount, summary.cap_amount
    );
    println!(
        "Allocated ${:.0} in {} iteration(s){}",
        summary.allocated_total,
        summary.iterations,
        if summary.converged {
            String::new()
        } else {
            format!(", not converged (residual ${:.0})", summary.residual)
        }
    );

    println!(
        "\n{:<5} {:<28} {:>14} {:>8} {:>10} {:>10}",
        "Rank", "Region", "Allocation", "Share", "Per HH", "Composite"
    );
    let mut rows: Vec<_> = outcome.rows.iter().collect();
    rows.sort_by_key(|row| row.metrics.allocation_rank);
    for row in rows {
        println!(
            "{:<5} {:<28} {:>14.0} {:>7}% {:>10} {:>10.4}",
            row.metrics.allocation_rank,
            row.region.region_name,
            row.final_allocation,
            format_optional(row.metrics.allocation_share.map(|share| share * 100.0), 1),
            format_optional(row.metrics.allocation_per_household, 2),
            row.composite.composite_score,
        );
    }

    println!("\nEquity");
    println!(
        "  CV {:.3}  Gini {:.3}  Theil {:.3}  Atkinson {:.3}  Hoover {:.3}",
        equity.coefficient_variation,
        equity.gini_coefficient,
        equity.theil_index,
        equity.atkinson_index,
        equity.hoover_index
    );
    println!(
        "  Urban/rural per-capita ratio {:.2} ({} urban, {} rural)",
        equity.urban_rural_ratio, equity.urban_count, equity.rural_count
    );
    println!("  Targets met: {}", equity.targets_met());

    if outcome.diagnostics.is_empty() {
        println!("\nDiagnostics: none");
    } else {
        println!("\nDiagnostics");
        for diagnostic in &outcome.diagnostics {
            println!("  - {diagnostic}");
        }
    }
}

fn render_stats_row(label: &str, stats: &AllocationStats) {
    println!(
        "{:<26} {:>14.0} {:>12.0} {:>12.0} {:>8.3} {:>12.0}",
        label,
        stats.total_allocation,
        stats.min_allocation,
        stats.max_allocation,
        stats.coefficient_variation,
        stats.households_served_total,
    );
}

fn render_stats_header(label: &str) {
    println!(
        "{:<26} {:>14} {:>12} {:>12} {:>8} {:>12}",
        label, "Total", "Min", "Max", "CV", "Households"
    );
}

fn render_scenarios(comparisons: &[ScenarioComparison]) {
    println!("Scenario comparison\n");
    render_stats_header("Scenario");
    for comparison in comparisons {
        render_stats_row(comparison.scenario.label(), &comparison.stats);
    }

    println!("\nEquity by scenario");
    for comparison in comparisons {
        println!(
            "  {:<22} Gini {:.3}  CV {:.3}  urban/rural {:.2}",
            comparison.scenario.label(),
            comparison.equity.gini_coefficient,
            comparison.equity.coefficient_variation,
            comparison.equity.urban_rural_ratio,
        );
    }
}

fn render_variants(runs: &[VariantRun]) {
    println!("Variant comparison\n");
    render_stats_header("Variant");
    for run in runs {
        render_stats_row(run.variant, &run.stats);
        if !run.converged {
            println!("{:<26} (redistribution did not converge)", "");
        }
    }
}

fn render_sensitivity(parameter: SensitivityParameter, points: &[SensitivityPoint]) {
    println!("Sensitivity: {}\n", parameter.name());
    render_stats_header("Value");
    for point in points {
        render_stats_row(&format!("{:.3}", point.value), &point.stats);
    }
}

fn render_monte_carlo(report: &MonteCarloReport) {
    let stats = &report.statistics;
    println!(
        "Monte Carlo: {} simulations (seed {})",
        report.n_simulations, report.seed
    );
    println!(
        "  Total allocation  mean ${:.0}  std ${:.0}",
        stats.mean_total_allocation, stats.std_total_allocation
    );
    println!(
        "  95% interval      ${:.0} .. ${:.0}",
        stats.ci_95_lower_total, stats.ci_95_upper_total
    );
    println!(
        "  Households served mean {:.0}  std {:.0}",
        stats.mean_households_served, stats.std_households_served
    );
    println!(
        "  P(shortfall) {:.3}  P(surplus) {:.3}",
        stats.probability_shortfall, stats.probability_surplus
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_table_reads_csv_files() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "region_id,region_name,total_population,low_income_population,poverty_rate,median_income,energy_burden_pct,households_served,avg_benefit,compliance_score,utilization_rate,seniors_65_plus,disabled_population,children_under_18"
        )
        .expect("write header");
        writeln!(
            file,
            "REG_001,Alpha,120000,24000,0.18,41000,0.14,2100,360,0.91,0.86,19000,12000,27000"
        )
        .expect("write row");

        let table = load_table(file.path()).expect("table loads");
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].region_name, "Alpha");
    }

    #[test]
    fn missing_files_surface_as_ingest_errors() {
        let error = load_table(Path::new("/nonexistent/regions.csv")).expect_err("missing file");
        assert!(matches!(error, AppError::Ingest(_)));
    }

    #[test]
    fn optional_values_render_placeholder() {
        assert_eq!(format_optional(None, 2), "n/a");
        assert_eq!(format_optional(Some(1.23456), 2), "1.23");
    }
}
