//! Volatility connectedness CLI
//!
//! Usage:
//! ```bash
//! connectedness init-config --output config.json
//! connectedness run --config config.json --window 200 --horizon 10
//! connectedness volatility --file data/^GSPC.csv
//! connectedness select-lag --config config.json --max-lag 20
//! connectedness demo
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use volatility_connectedness::data::generate_correlated_bars;
use volatility_connectedness::{
    select_lag_order, DataLoader, InformationCriterion, LagSelection, MarketSource, Pipeline,
    PipelineConfig, PipelineResult, YangZhangEstimator,
};

#[derive(Parser)]
#[command(name = "connectedness")]
#[command(about = "Rolling Diebold-Yilmaz volatility connectedness")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline from a configuration file
    Run {
        /// Configuration file (JSON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rolling window length (rows)
        #[arg(short, long)]
        window: Option<usize>,

        /// VAR lag order
        #[arg(short, long)]
        lag: Option<usize>,

        /// Forecast horizon
        #[arg(short = 'H', long)]
        horizon: Option<usize>,

        /// Rows between window starts
        #[arg(short, long)]
        stride: Option<usize>,

        /// Write the rolling total connectedness to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the full-sample table to this JSON file
        #[arg(long)]
        table_json: Option<PathBuf>,
    },

    /// Compute Yang-Zhang volatility of one price file
    Volatility {
        /// CSV file with Date, Open, High, Low, Close columns
        #[arg(short, long)]
        file: PathBuf,

        /// Averaging window
        #[arg(short = 'n', long, default_value = "2")]
        window: usize,

        /// Number of rows to print
        #[arg(short, long, default_value = "10")]
        rows: usize,

        /// Write the series to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare VAR lag orders by information criterion
    SelectLag {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Largest lag order to try
        #[arg(short, long, default_value = "20")]
        max_lag: usize,

        /// aic or bic
        #[arg(long, default_value = "aic")]
        criterion: InformationCriterion,
    },

    /// Write the default configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Run the pipeline on synthetic correlated markets
    Demo {
        /// Number of markets
        #[arg(short, long, default_value = "4")]
        markets: usize,

        /// Number of trading days
        #[arg(short, long, default_value = "1000")]
        days: usize,

        /// Loading on the common shock
        #[arg(short, long, default_value = "0.6")]
        correlation: f64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            config,
            window,
            lag,
            horizon,
            stride,
            output,
            table_json,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(w) = window {
                cfg.rolling_window = w;
            }
            if let Some(p) = lag {
                cfg.lag_order = p;
                cfg.lag_selection = None;
            }
            if let Some(h) = horizon {
                cfg.horizon = h;
            }
            if let Some(s) = stride {
                cfg.stride = s;
            }
            cmd_run(cfg, output.as_deref(), table_json.as_deref())?;
        }
        Commands::Volatility {
            file,
            window,
            rows,
            output,
        } => {
            cmd_volatility(&file, window, rows, output.as_deref())?;
        }
        Commands::SelectLag {
            config,
            max_lag,
            criterion,
        } => {
            let cfg = load_config(config.as_deref())?;
            cmd_select_lag(cfg, max_lag, criterion)?;
        }
        Commands::InitConfig { output } => {
            PipelineConfig::default()
                .to_file(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("{} {}", "Configuration written to".green(), output.display());
        }
        Commands::Demo {
            markets,
            days,
            correlation,
            seed,
        } => {
            cmd_demo(markets, days, correlation, seed)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(p)
            .with_context(|| format!("Failed to read configuration {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn header(title: &str) {
    println!("{}", "=".repeat(60).blue());
    println!("{}", title.bold().blue());
    println!("{}", "=".repeat(60).blue());
}

fn cmd_run(config: PipelineConfig, output: Option<&Path>, table_json: Option<&Path>) -> Result<()> {
    header("Volatility Connectedness");
    let pipeline = Pipeline::new(config).context("Invalid configuration")?;
    let result = pipeline.run().context("Pipeline failed")?;

    print_result(&result);

    if let Some(path) = output {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(["date", "total_connectedness"])?;
        for (date, total) in result.rolling_index() {
            writer.write_record([date.to_string(), format!("{:.6}", total)])?;
        }
        writer.flush()?;
        println!("\n{} {}", "Rolling index written to".green(), path.display());
    }

    if let Some(path) = table_json {
        let json = serde_json::to_string_pretty(&result.full_sample)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{} {}", "Full-sample table written to".green(), path.display());
    }

    Ok(())
}

fn print_result(result: &PipelineResult) {
    println!(
        "\n{} {} rows x {} markets ({} to {})",
        "Panel:".green(),
        result.panel.n_rows(),
        result.panel.n_markets(),
        result.panel.first_date().map(|d| d.to_string()).unwrap_or_default(),
        result.panel.last_date().map(|d| d.to_string()).unwrap_or_default()
    );
    println!("{}", result.panel.display(5));

    if let Some(selection) = &result.lag_selection {
        println!(
            "{} {} by {}",
            "Selected lag:".cyan(),
            selection.selected,
            selection.criterion
        );
    }

    let full = &result.full_sample;
    println!(
        "\n{}",
        format!("Full-sample connectedness (VAR({}), H = {})", result.lag_order, full.table.horizon()).bold()
    );
    println!("{}", "-".repeat(60));
    println!("{}", full.table.summary());
    println!(
        "Mean R²: {:.4}   AIC: {:.4}   BIC: {:.4}",
        full.fit.mean_r_squared(),
        full.fit.aic,
        full.fit.bic
    );

    if result.windows.is_empty() && result.failures.is_empty() {
        return;
    }

    println!("\n{}", "Rolling connectedness".bold());
    println!("{}", "-".repeat(60));
    let index = result.rolling_index();
    if let (Some(first), Some(last)) = (index.first(), index.last()) {
        let values: Vec<f64> = index.iter().map(|(_, v)| *v * 100.0).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        println!("Windows:  {}", index.len());
        println!("First:    {} {:.2}%", first.0, first.1 * 100.0);
        println!("Last:     {} {:.2}%", last.0, last.1 * 100.0);
        println!("Mean:     {:.2}%", mean);
        println!("Range:    {:.2}% - {:.2}%", min, max);
    }
    if !result.failures.is_empty() {
        println!(
            "{} {} windows skipped",
            "Warning:".yellow(),
            result.failures.len()
        );
        for failure in result.failures.iter().take(5) {
            println!("  {}", failure);
        }
    }
    if result.cancelled {
        println!("{}", "Run cancelled before all windows finished".yellow());
    }
}

fn cmd_volatility(file: &Path, window: usize, rows: usize, output: Option<&Path>) -> Result<()> {
    let market = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "market".to_string());

    let bars = DataLoader::load_bars(&market, file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    info!("Loaded {} bars for {}", bars.len(), market);

    let series = YangZhangEstimator::new(window)?.series(&market, &bars);

    header(&format!("Yang-Zhang Volatility: {}", market));
    println!("{:<12} {:>12}", "Date", "Volatility");
    println!("{}", "-".repeat(25));
    for (date, value) in series.dates.iter().zip(series.values.iter()).take(rows) {
        match value {
            Some(v) => println!("{:<12} {:>12.6}", date, v),
            None => println!("{:<12} {:>12}", date, "-"),
        }
    }
    if series.len() > rows {
        println!("... {} more rows", series.len() - rows);
    }

    let defined: Vec<f64> = series.defined().map(|(_, v)| v).collect();
    if !defined.is_empty() {
        let mean = defined.iter().sum::<f64>() / defined.len() as f64;
        println!("\n{} {:.6}", "Mean volatility:".green(), mean);
    }
    println!("{} {}", "Undefined values:".cyan(), series.undefined_count());

    if let Some(path) = output {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(["date", "volatility"])?;
        for (date, value) in series.dates.iter().zip(series.values.iter()) {
            let cell = value.map(|v| format!("{:.8}", v)).unwrap_or_default();
            writer.write_record([date.to_string(), cell])?;
        }
        writer.flush()?;
        println!("{} {}", "Series written to".green(), path.display());
    }

    Ok(())
}

fn cmd_select_lag(config: PipelineConfig, max_lag: usize, criterion: InformationCriterion) -> Result<()> {
    let config = PipelineConfig {
        lag_selection: Some(LagSelection { max_lag, criterion }),
        ..config
    };
    let pipeline = Pipeline::new(config).context("Invalid configuration")?;
    let bars = pipeline.load_bars()?;
    let series = pipeline.volatility(&bars)?;
    let panel = pipeline.align(&series)?;

    let result = select_lag_order(panel.values().view(), max_lag, criterion)?;

    header("VAR Lag Selection");
    println!("{:>5} {:>14} {:>14}", "Lag", "AIC", "BIC");
    println!("{}", "-".repeat(35));
    for score in &result.scores {
        let line = format!("{:>5} {:>14.6} {:>14.6}", score.lag_order, score.aic, score.bic);
        if score.lag_order == result.selected {
            println!("{}", line.green().bold());
        } else {
            println!("{}", line);
        }
    }
    println!(
        "\n{} {} ({})",
        "Selected lag order:".green(),
        result.selected,
        result.criterion
    );

    Ok(())
}

/// Smallest rolling window the demo uses
const DEMO_MIN_WINDOW: usize = 50;

/// Rolling window for a demo of `days` bars; the panel has `days - 1` rows
fn demo_window(days: usize) -> Result<usize> {
    if days <= DEMO_MIN_WINDOW {
        anyhow::bail!(
            "The demo needs more than {} days, got {}",
            DEMO_MIN_WINDOW,
            days
        );
    }
    Ok((days / 4).max(DEMO_MIN_WINDOW).min(days - 1))
}

fn cmd_demo(n_markets: usize, days: usize, correlation: f64, seed: u64) -> Result<()> {
    if n_markets < 2 {
        anyhow::bail!("The demo needs at least two markets");
    }
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).context("Invalid start date")?;
    let bars = generate_correlated_bars(n_markets, days, start, 0.012, correlation, seed);

    let names: Vec<String> = (1..=n_markets).map(|i| format!("Market{}", i)).collect();
    let last = bars
        .first()
        .and_then(|b| b.last())
        .map(|b| b.date)
        .context("No synthetic bars generated")?;

    let config = PipelineConfig {
        markets: names
            .iter()
            .map(|n| MarketSource::new(n.clone(), format!("{}.csv", n)))
            .collect(),
        start,
        end: last,
        rolling_window: demo_window(days)?,
        stride: 5,
        ..Default::default()
    };

    header("Synthetic Connectedness Demo");
    info!(
        "Generated {} days for {} markets (correlation {})",
        days, n_markets, correlation
    );

    let input = names.into_iter().zip(bars).collect();
    let result = Pipeline::new(config)?.run_with_bars(input)?;
    print_result(&result);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_window_fits_panel() {
        assert!(demo_window(10).is_err());
        assert!(demo_window(50).is_err());
        assert_eq!(demo_window(51).unwrap(), 50);
        assert_eq!(demo_window(1000).unwrap(), 250);
        for days in 51..400 {
            assert!(demo_window(days).unwrap() <= days - 1);
        }
    }
}
