//! ReplayLab CLI — run and inspect backtests from TOML configs.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML run file and print the summary
//! - `check` — validate a run file and its data, print the run fingerprint
//!
//! A run file is the engine's `BacktestConfig` plus a `[data]` table mapping
//! each watchlist instrument to a CSV bar file:
//!
//! ```toml
//! start = "2021-01-01T00:00:00Z"
//! end = "2022-01-01T00:00:00Z"
//!
//! [strategy]
//! name = "macd_crossover"
//! watchlist = ["EUR_USD"]
//! sizing = "risk"
//! risk_pc = 1.5
//!
//! [strategy.params]
//! ema_period = 200
//! macd_fast = 5
//! macd_slow = 19
//! macd_smoothing = 9
//! rr = 1.5
//!
//! [account]
//! initial_balance = 1000.0
//! leverage = 30.0
//! spread = 0.00005
//! commission_rate = 0.005
//! hedging_enabled = true
//!
//! [data]
//! EUR_USD = "data/EUR_USD_H4.csv"
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use replaylab_core::config::{AccountConfig, BacktestConfig, StrategyConfig};
use replaylab_core::domain::{validate_series, Bar};
use replaylab_core::engine::run_backtest;
use replaylab_core::fingerprint::RunFingerprint;

#[derive(Parser)]
#[command(
    name = "replaylab",
    about = "ReplayLab CLI — deterministic backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML run file.
    Run {
        /// Path to the TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Write the full report (trades, equity, summary) as JSON here.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also print the trade log to stdout.
        #[arg(long, default_value_t = false)]
        trades: bool,
    },
    /// Validate a run file and its data without running; print the fingerprint.
    Check {
        /// Path to the TOML run file.
        #[arg(long)]
        config: PathBuf,
    },
}

/// A run file: the engine config plus the instrument -> CSV mapping.
#[derive(Debug, Deserialize)]
struct RunFile {
    strategy: StrategyConfig,
    account: AccountConfig,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    min_units: BTreeMap<String, f64>,
    data: BTreeMap<String, PathBuf>,
}

impl RunFile {
    fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading run file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing run file {}", path.display()))
    }

    fn into_parts(self) -> (BacktestConfig, BTreeMap<String, PathBuf>) {
        (
            BacktestConfig {
                strategy: self.strategy,
                account: self.account,
                start: self.start,
                end: self.end,
                min_units: self.min_units,
            },
            self.data,
        )
    }
}

/// One CSV row. The timestamp column accepts RFC 3339 or a naive
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC).
#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("unrecognized timestamp {raw:?}"))?;
    Ok(naive.and_utc())
}

fn load_csv_bars(instrument: &str, path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {} for {instrument}", path.display()))?;

    let mut bars = Vec::new();
    for (row, record) in reader.deserialize::<CsvBar>().enumerate() {
        let record = record.with_context(|| format!("{}: row {}", path.display(), row + 1))?;
        bars.push(Bar {
            instrument: instrument.to_string(),
            timestamp: parse_timestamp(&record.timestamp)
                .with_context(|| format!("{}: row {}", path.display(), row + 1))?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    validate_series(instrument, &bars)
        .with_context(|| format!("{}: bad series for {instrument}", path.display()))?;
    Ok(bars)
}

fn load_all_data(
    files: &BTreeMap<String, PathBuf>,
    base_dir: &Path,
) -> Result<HashMap<String, Vec<Bar>>> {
    let mut data = HashMap::new();
    for (instrument, file) in files {
        let path = if file.is_absolute() {
            file.clone()
        } else {
            base_dir.join(file)
        };
        data.insert(instrument.clone(), load_csv_bars(instrument, &path)?);
    }
    Ok(data)
}

fn cmd_run(config_path: &Path, output: Option<&Path>, print_trades: bool) -> Result<()> {
    let run_file = RunFile::load(config_path)?;
    let base_dir = config_path.parent().unwrap_or(Path::new("."));
    let (config, files) = run_file.into_parts();
    let data = load_all_data(&files, base_dir)?;

    let report = run_backtest(&config, &data).context("backtest failed")?;

    if report.is_partial() {
        eprintln!("warning: partial result ({:?})", report.outcome);
    }

    println!("{}", serde_json::to_string_pretty(&report.summary)?);
    if print_trades {
        println!("{}", serde_json::to_string_pretty(&report.trades)?);
    }

    if let Some(dir) = output {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!("report_{}.json", &report.fingerprint[..16]));
        fs::write(&path, serde_json::to_vec_pretty(&report)?)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("report written to {}", path.display());
    }

    Ok(())
}

fn cmd_check(config_path: &Path) -> Result<()> {
    let run_file = RunFile::load(config_path)?;
    let base_dir = config_path.parent().unwrap_or(Path::new("."));
    let (config, files) = run_file.into_parts();

    config.validate().context("invalid configuration")?;
    for instrument in &config.strategy.watchlist {
        if !files.contains_key(instrument) {
            anyhow::bail!("watchlist instrument {instrument} has no [data] entry");
        }
    }
    let data = load_all_data(&files, base_dir)?;

    let fingerprint = RunFingerprint::compute(&config, &data);
    println!("config   {}", fingerprint.config_hash);
    println!("dataset  {}", fingerprint.dataset_hash);
    println!("run      {}", fingerprint.hash());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            output,
            trades,
        } => cmd_run(&config, output.as_deref(), trades),
        Commands::Check { config } => cmd_check(&config),
    }
}
