//! Command-line interface for the walk-forward engine.

use strategy_lab::analytics::{MetricsConfig, PerformanceMetrics};
use strategy_lab::config::RunConfig;
use strategy_lab::data::{load_csv, prepare, validate, CleanMethod, DataConfig, DataKind, PrepareOptions};
use strategy_lab::engine::WalkForwardEngine;
use strategy_lab::error::Result;
use strategy_lab::export::{report_to_json, results_to_csv, write_results_csv, ResultFormatter};
use strategy_lab::strategy::{StrategyParams, StrategyRegistry};
use strategy_lab::types::{ReturnMatrix, WindowConfig, WindowType};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Strategy Lab - walk-forward backtesting of portfolio weighting strategies.
#[derive(Parser)]
#[command(name = "strategy-lab")]
#[command(version)]
#[command(about = "Walk-forward backtesting of portfolio weighting strategies")]
#[command(long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a walk-forward backtest with a registered strategy
    Run {
        /// Path to CSV data file (date column plus one column per asset)
        #[arg(short, long)]
        data: PathBuf,

        /// The file holds prices; convert them to log returns
        #[arg(long)]
        prices: bool,

        /// Fill missing values: ffill, bfill or fill_zero
        #[arg(long)]
        clean: Option<CleanMethod>,

        /// Resample to month-end before running
        #[arg(long)]
        resample_monthly: bool,

        /// Strategy to use (see `strategies`)
        #[arg(short = 'S', long, default_value = "equal_weight")]
        strategy: String,

        /// Number of assets held by the momentum strategy
        #[arg(long)]
        top_n: Option<usize>,

        /// Training window length in rows
        #[arg(long, default_value = "12")]
        train: usize,

        /// Holding period in rows
        #[arg(long, default_value = "1")]
        test: usize,

        /// Window type: rolling or expanding
        #[arg(short, long, default_value = "rolling")]
        window: WindowType,

        /// Annual risk-free rate (as decimal)
        #[arg(long, default_value = "0.0")]
        risk_free: f64,

        /// Return periods per year
        #[arg(long, default_value = "12")]
        periods_per_year: u32,

        /// Write the result table to a CSV file
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Weight rows shown in text output (0 for all)
        #[arg(long, default_value = "12")]
        limit: usize,
    },

    /// Run a backtest from a configuration file
    RunConfig {
        /// Path to TOML configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "strategy-lab.toml")]
        output: PathBuf,
    },

    /// Validate a data file
    Validate {
        /// Path to CSV data file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Show information about available strategies
    Strategies,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("Failed to set tracing subscriber");
        }
    }
}

/// Everything needed for one backtest run.
struct RunPlan {
    data: PathBuf,
    data_config: DataConfig,
    prepare: PrepareOptions,
    strategy: String,
    params: StrategyParams,
    window: WindowConfig,
    metrics: MetricsConfig,
    export: Option<PathBuf>,
    limit: usize,
}

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    match cli.command {
        Commands::Run {
            data,
            prices,
            clean,
            resample_monthly,
            strategy,
            top_n,
            train,
            test,
            window,
            risk_free,
            periods_per_year,
            export,
            limit,
        } => {
            let plan = RunPlan {
                data,
                data_config: DataConfig::default(),
                prepare: PrepareOptions {
                    kind: if prices { DataKind::Prices } else { DataKind::Returns },
                    clean,
                    resample_monthly,
                },
                strategy,
                params: StrategyParams { top_n },
                window: WindowConfig::new(train, test, window)?,
                metrics: MetricsConfig {
                    risk_free_rate: risk_free,
                    periods_per_year,
                },
                export,
                limit,
            };
            execute(&plan, cli.output)
        }
        Commands::RunConfig { config } => run_from_config(&config, cli.output),
        Commands::Init { output } => init_config(&output),
        Commands::Validate { data } => validate_data(&data, cli.output),
        Commands::Strategies => list_strategies(cli.output),
    }
}

fn run_from_config(config_path: &Path, output: OutputFormat) -> Result<()> {
    let config = RunConfig::load(config_path)?;

    let plan = RunPlan {
        data: PathBuf::from(config.data_path()?),
        data_config: config.data_config(),
        prepare: config.prepare_options()?,
        strategy: config.strategy.name.clone(),
        params: config.strategy.params.clone(),
        window: config.window_config()?,
        metrics: config.metrics_config(),
        export: config.output.export_csv.as_ref().map(PathBuf::from),
        limit: 12,
    };
    execute(&plan, output)
}

fn load_returns(path: &Path, data_config: &DataConfig, options: &PrepareOptions) -> Result<ReturnMatrix> {
    let raw = load_csv(path, data_config)?;
    prepare(raw, options)
}

fn execute(plan: &RunPlan, output: OutputFormat) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    let strategy = registry.create(&plan.strategy, &plan.params)?;

    let returns = load_returns(&plan.data, &plan.data_config, &plan.prepare)?;
    let report = validate(&returns, false);
    info!("{}", report.summary());

    let engine = WalkForwardEngine::new(returns);
    let table = engine.run_with_config(&strategy, &plan.window)?;

    if let Some(path) = &plan.export {
        write_results_csv(&table, path)?;
        info!("Results written to: {}", path.display());
    }

    if table.is_empty() {
        warn!(
            "No backtest periods: {} rows cannot fit train {} + test {}",
            engine.returns().len(),
            plan.window.train_steps,
            plan.window.test_steps
        );
        if output == OutputFormat::Text {
            println!("{}", "Not enough data for a single walk-forward window.".yellow());
        }
        return Ok(());
    }

    let metrics = PerformanceMetrics::calculate(table.strategy_returns(), &plan.metrics)?;

    match output {
        OutputFormat::Text => {
            ResultFormatter::print_report(&table, strategy.name(), &metrics);
            println!();
            ResultFormatter::print_weights(&table, plan.limit);
        }
        OutputFormat::Json => println!("{}", report_to_json(&table, strategy.name(), &metrics)?),
        OutputFormat::Csv => print!("{}", results_to_csv(&table)?),
    }

    Ok(())
}

fn init_config(output: &Path) -> Result<()> {
    fs::write(output, RunConfig::example())?;
    println!("Created example configuration file: {}", output.display());
    println!("\nEdit this file to customize your backtest, then run:");
    println!("  strategy-lab run-config -c {}", output.display());
    Ok(())
}

fn validate_data(data_path: &Path, output: OutputFormat) -> Result<()> {
    let matrix = load_csv(data_path, &DataConfig::default())?;
    let report = validate(&matrix, true);

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Validating data file: {}", data_path.display());
    println!("\nData Summary:");
    println!("  Rows:      {}", report.rows);
    println!("  Assets:    {}", matrix.columns().join(", "));
    if let (Some(start), Some(end)) = (report.start, report.end) {
        println!("  Start:     {}", start.format("%Y-%m-%d"));
        println!("  End:       {}", end.format("%Y-%m-%d"));
    }
    match report.frequency {
        Some(freq) => println!("  Frequency: {}", freq),
        None => println!("  Frequency: {}", "irregular".yellow()),
    }

    if report.missing_values > 0 {
        println!("  Missing:   {}", report.missing_values.to_string().yellow());
        for column in matrix.columns() {
            let missing = matrix
                .column(column)
                .map(|values| values.iter().filter(|v| v.is_nan()).count())
                .unwrap_or(0);
            if missing > 0 {
                println!("    {:<12} {}", column, missing);
            }
        }
        println!("\nValidation: {} (use --clean to fill gaps)", "WARNINGS".yellow());
    } else {
        println!("\nValidation: {}", "PASSED".green());
    }
    Ok(())
}

fn list_strategies(output: OutputFormat) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();

    if output == OutputFormat::Json {
        let entries: Vec<_> = registry
            .describe()
            .into_iter()
            .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut builder = Builder::new();
    builder.push_record(["Strategy", "Description"]);
    for (name, description) in registry.describe() {
        builder.push_record([name, description]);
    }
    println!("{}", builder.build().with(Style::rounded()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::try_parse_from([
            "strategy-lab",
            "run",
            "-d",
            "prices.csv",
            "--prices",
            "--clean",
            "ffill",
            "-S",
            "momentum",
            "--top-n",
            "2",
            "--train",
            "24",
            "--window",
            "expanding",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                prices,
                clean,
                strategy,
                top_n,
                train,
                test,
                window,
                ..
            } => {
                assert!(prices);
                assert_eq!(clean, Some(CleanMethod::ForwardFill));
                assert_eq!(strategy, "momentum");
                assert_eq!(top_n, Some(2));
                assert_eq!(train, 24);
                assert_eq!(test, 1);
                assert_eq!(window, WindowType::Expanding);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["strategy-lab", "run", "-d", "x.csv", "--window", "anchored"]).is_err());
        assert!(Cli::try_parse_from(["strategy-lab", "run", "-d", "x.csv", "--clean", "mean"]).is_err());
    }

    #[test]
    fn test_cli_output_and_verbosity() {
        let cli = Cli::try_parse_from(["strategy-lab", "-vv", "-o", "json", "strategies"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_other_commands() {
        assert!(Cli::try_parse_from(["strategy-lab", "run-config", "-c", "run.toml"]).is_ok());
        assert!(Cli::try_parse_from(["strategy-lab", "init"]).is_ok());
        assert!(Cli::try_parse_from(["strategy-lab", "validate", "-d", "data.csv"]).is_ok());
    }
}
