use crate::reports::{
    run_allocate, run_monte_carlo, run_scenarios, run_sensitivity, run_variants, AllocateArgs,
    MonteCarloArgs, ScenariosArgs, SensitivityArgs, VariantsArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use fund_allocation::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Fund Allocation Engine",
    about = "Allocate an assistance funding pool across regions from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Allocate the pool for one scenario and print the per-region result
    Allocate(AllocateArgs),
    /// Compare every named scenario against the same region table
    Scenarios(ScenariosArgs),
    /// Re-run one scenario under each data and funding variant
    Variants(VariantsArgs),
    /// Sweep one input multiplier and summarize each run
    Sensitivity(SensitivityArgs),
    /// Perturb inputs with seeded noise and summarize the spread of outcomes
    MonteCarlo(MonteCarloArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Allocate(args) => run_allocate(args),
        Command::Scenarios(args) => run_scenarios(args),
        Command::Variants(args) => run_variants(args),
        Command::Sensitivity(args) => run_sensitivity(args),
        Command::MonteCarlo(args) => run_monte_carlo(args),
    }
}
