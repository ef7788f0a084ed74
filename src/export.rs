//! Export and terminal reporting for walk-forward results.
//!
//! | Format | Use Case |
//! |--------|----------|
//! | CSV | `timestamp,Strategy,<assets...>`, one row per held period |
//! | JSON | API integration, structured data |
//! | Text | Colored summary and `tabled` tables for the terminal |

use crate::analytics::PerformanceMetrics;
use crate::error::Result;
use crate::types::{ResultTable, StrategyFailure};
use chrono::{DateTime, Utc};
use colored::Colorize;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

/// Configuration for exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Date format for CSV exports.
    pub date_format: String,
    /// Decimal precision for numeric values.
    pub precision: usize,
    /// Whether to include headers in CSV.
    pub include_headers: bool,
    /// Delimiter for CSV files.
    pub delimiter: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            precision: 8,
            include_headers: true,
            delimiter: b',',
        }
    }
}

/// Write a result table as CSV to any writer.
pub fn write_results<W: Write>(table: &ResultTable, writer: W, config: &ExportConfig) -> Result<()> {
    let mut csv = WriterBuilder::new()
        .delimiter(config.delimiter)
        .from_writer(writer);

    if config.include_headers {
        let mut header = vec!["timestamp".to_string()];
        header.extend(table.column_names());
        csv.write_record(&header)?;
    }

    let prec = config.precision;
    for row in table.rows() {
        let mut record = Vec::with_capacity(row.weights.len() + 2);
        record.push(row.timestamp.format(&config.date_format).to_string());
        record.push(format!("{:.prec$}", row.strategy));
        record.extend(row.weights.iter().map(|w| format!("{:.prec$}", w)));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Export a result table to a CSV file with default settings.
pub fn write_results_csv(table: &ResultTable, path: impl AsRef<Path>) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_results(table, std::io::BufWriter::new(file), &ExportConfig::default())
}

/// Render a result table as a CSV string.
pub fn results_to_csv(table: &ResultTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_results(table, &mut buffer, &ExportConfig::default())?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[derive(Serialize)]
struct JsonRow<'a> {
    timestamp: DateTime<Utc>,
    #[serde(rename = "Strategy")]
    strategy: f64,
    weights: BTreeMap<&'a str, f64>,
}

#[derive(Serialize)]
struct JsonResults<'a> {
    assets: &'a [String],
    rows: Vec<JsonRow<'a>>,
    failures: &'a [StrategyFailure],
}

#[derive(Serialize)]
struct JsonReport<'a> {
    strategy: &'a str,
    metrics: &'a PerformanceMetrics,
    results: JsonResults<'a>,
}

fn json_results(table: &ResultTable) -> JsonResults<'_> {
    let rows = table
        .rows()
        .map(|row| JsonRow {
            timestamp: row.timestamp,
            strategy: row.strategy,
            weights: table
                .assets()
                .iter()
                .map(String::as_str)
                .zip(row.weights.iter().copied())
                .collect(),
        })
        .collect();

    JsonResults {
        assets: table.assets(),
        rows,
        failures: table.failures(),
    }
}

/// Serialize a result table to pretty JSON.
///
/// Missing returns are written as `null`.
pub fn results_to_json(table: &ResultTable) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json_results(table))?)
}

/// Serialize a full run (strategy name, metrics and result rows) to pretty JSON.
pub fn report_to_json(
    table: &ResultTable,
    strategy_name: &str,
    metrics: &PerformanceMetrics,
) -> Result<String> {
    let report = JsonReport {
        strategy: strategy_name,
        metrics,
        results: json_results(table),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Serialize metrics to pretty JSON.
pub fn metrics_to_json(metrics: &PerformanceMetrics) -> Result<String> {
    Ok(serde_json::to_string_pretty(metrics)?)
}

/// Format results for terminal display.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Metric name and display value pairs.
    pub fn metrics_rows(metrics: &PerformanceMetrics) -> Vec<(&'static str, String)> {
        let pct = |v: f64| format!("{:.1}%", v * 100.0);
        vec![
            ("Total Return", pct(metrics.total_return)),
            ("Annualized Return", pct(metrics.annualized_return)),
            ("Annualized Volatility", pct(metrics.annualized_volatility)),
            ("Sharpe Ratio", format!("{:.1}", metrics.sharpe_ratio)),
            ("Sortino Ratio", format!("{:.1}", metrics.sortino_ratio)),
            ("Calmar Ratio", format!("{:.1}", metrics.calmar_ratio)),
            ("Max Drawdown", pct(metrics.max_drawdown)),
            ("Skewness", format!("{:.1}", metrics.skewness)),
            ("Excess Kurtosis", format!("{:.1}", metrics.excess_kurtosis)),
        ]
    }

    /// Print a results report to stdout.
    pub fn print_report(table: &ResultTable, strategy_name: &str, metrics: &PerformanceMetrics) {
        println!();
        println!("{}", "═".repeat(60).blue());
        println!("{}", " WALK-FORWARD RESULTS ".bold().blue());
        println!("{}", "═".repeat(60).blue());
        println!();

        println!("{}", "Overview".bold().underline());
        println!("  Strategy:        {}", strategy_name);
        println!("  Assets:          {}", table.assets().join(", "));
        if let (Some(start), Some(end)) = (table.index().first(), table.index().last()) {
            println!(
                "  Period:          {} to {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            );
        }
        println!("  Periods:         {}", metrics.periods);
        println!(
            "  Total Return:    {:>12}",
            Self::format_pct_change(metrics.total_return * 100.0)
        );
        println!();

        println!("{}", "Metrics".bold().underline());
        let mut builder = Builder::new();
        builder.push_record(["Metric", "Value"]);
        for (name, value) in Self::metrics_rows(metrics) {
            builder.push_record([name.to_string(), value]);
        }
        println!("{}", builder.build().with(Style::rounded()));

        if !table.failures().is_empty() {
            println!();
            println!(
                "{}",
                format!(
                    "{} strategy call(s) failed and were held at zero weight",
                    table.failures().len()
                )
                .yellow()
            );
            for failure in table.failures() {
                println!(
                    "  {}  {}",
                    failure.timestamp.format("%Y-%m-%d"),
                    failure.message
                );
            }
        }

        println!();
        println!("{}", "═".repeat(60).blue());
    }

    /// Format percentage change with color.
    fn format_pct_change(pct: f64) -> String {
        if pct >= 0.0 {
            format!("+{:.2}%", pct).green().to_string()
        } else {
            format!("{:.2}%", pct).red().to_string()
        }
    }

    /// Build the weight history table, showing at most `limit` rows
    /// (0 for all).
    pub fn weights_table(table: &ResultTable, limit: usize) -> String {
        let mut builder = Builder::new();
        let mut header = vec!["Date".to_string()];
        header.extend(table.column_names());
        builder.push_record(header);

        let shown = if limit > 0 { limit.min(table.len()) } else { table.len() };
        for row in table.rows().take(shown) {
            let mut record = vec![
                row.timestamp.format("%Y-%m-%d").to_string(),
                format!("{:+.4}", row.strategy),
            ];
            record.extend(row.weights.iter().map(|w| format!("{:.3}", w)));
            builder.push_record(record);
        }

        builder.build().with(Style::rounded()).to_string()
    }

    /// Print the weight history table.
    pub fn print_weights(table: &ResultTable, limit: usize) {
        if table.is_empty() {
            println!("No backtest periods.");
            return;
        }

        println!("{}", Self::weights_table(table, limit));

        if limit > 0 && limit < table.len() {
            println!("... and {} more rows", table.len() - limit);
        }
    }
}
