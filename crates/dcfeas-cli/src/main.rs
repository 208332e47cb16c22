mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::invest::InvestArgs;
use commands::overrides::OverridesArgs;
use commands::project::ProjectArgs;
use commands::ramp::RampArgs;
use commands::readiness::ReadinessArgs;
use commands::sensitivity::SensitivityArgs;

/// Data-center investment feasibility analysis
#[derive(Parser)]
#[command(
    name = "dcfeas",
    version,
    about = "Data-center investment feasibility analysis",
    long_about = "Projects unlevered facility cash flows (NPV, IRR, payback, break-even \
                  occupancy) and layers a debt/equity structure on top (debt schedule, \
                  DSCR, equity IRR, MOIC, exit valuation, sensitivity grid, readiness \
                  score) with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Project unlevered cash flows and project returns
    Project(ProjectArgs),
    /// Run the capital structure and leveraged returns analysis
    Invest(InvestArgs),
    /// Equity IRR across debt ratios and exit multiples
    Sensitivity(SensitivityArgs),
    /// Score investment readiness from headline metrics
    Readiness(ReadinessArgs),
    /// Apply manual cell overrides to a projection
    Overrides(OverridesArgs),
    /// Generate a straight-line occupancy ramp
    Ramp(RampArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(level: &str) {
    let default_filter = format!("dcfeas={level},dcfeas_core={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::project::run_project(args),
        Commands::Invest(args) => commands::invest::run_invest(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Readiness(args) => commands::readiness::run_readiness(args),
        Commands::Overrides(args) => commands::overrides::run_overrides(args),
        Commands::Ramp(args) => commands::ramp::run_ramp(args),
        Commands::Version => {
            println!("dcfeas {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
