//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::bar::Bar;
use crate::domain::config_validation::{
    DataSelection, backtest_config_from, data_selection_from, signal_rule_from,
    validate_backtest_config, validate_strategy_config,
};
use crate::domain::engine::ExitRule;
use crate::domain::error::FxlabError;
use crate::domain::signals::{SignalRule, apply_signals};
use crate::domain::sweep::{best_by_profit, sweep_brackets};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "fxlab", about = "FX signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        /// Directory for trades.csv and equity.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Grid-search stop-loss and take-profit distances in bracket mode
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        /// Stop-loss distances in pips, comma separated
        #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
        stop_loss: Vec<f64>,
        /// Take-profit distances in pips, comma separated
        #[arg(long, value_delimiter = ',', num_args = 1.., required = true)]
        take_profit: Vec<f64>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with data for a timeframe
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        timeframe: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Dispatches the parsed command.
pub fn execute(cli: Cli) -> Result<(), FxlabError> {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            timeframe,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(
                    &config,
                    symbol.as_deref(),
                    timeframe.as_deref(),
                    output.as_deref(),
                )
            }
        }
        Command::Sweep {
            config,
            symbol,
            timeframe,
            stop_loss,
            take_profit,
        } => run_sweep(
            &config,
            symbol.as_deref(),
            timeframe.as_deref(),
            &stop_loss,
            &take_profit,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config, timeframe } => {
            run_list_symbols(&config, timeframe.as_deref())
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FxlabError> {
    let config = FileConfigAdapter::from_file(path)?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

/// `[data] path`, the directory holding `<SYMBOL>_<TIMEFRAME>.csv` files.
pub fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, FxlabError> {
    match config.get_string("data", "path") {
        Some(p) if !p.trim().is_empty() => Ok(PathBuf::from(p.trim())),
        _ => Err(FxlabError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        }),
    }
}

/// Data selection from `[data]` with command-line overrides applied.
/// An override also stands in for a missing key.
pub fn resolve_selection(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
    timeframe_override: Option<&str>,
) -> Result<DataSelection, FxlabError> {
    data_selection_from(&DataOverrides {
        inner: config,
        symbol: symbol_override,
        timeframe: timeframe_override,
    })
}

/// Config view answering `[data] symbol` and `timeframe` from the command line.
struct DataOverrides<'a> {
    inner: &'a dyn ConfigPort,
    symbol: Option<&'a str>,
    timeframe: Option<&'a str>,
}

impl ConfigPort for DataOverrides<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        let forced = match (section, key) {
            ("data", "symbol") => self.symbol,
            ("data", "timeframe") => self.timeframe,
            _ => None,
        };
        forced
            .map(str::to_string)
            .or_else(|| self.inner.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.inner.get_int(section, key, default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.inner.get_double(section, key, default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.inner.get_bool(section, key, default)
    }
}

/// Loads the selected series and applies the signal rule.
pub fn prepare_bars(
    data_port: &dyn DataPort,
    selection: &DataSelection,
    rule: &SignalRule,
) -> Result<Vec<Bar>, FxlabError> {
    let bars = data_port.fetch_bars(
        &selection.symbol,
        &selection.timeframe,
        selection.start,
        selection.end,
    )?;
    if bars.is_empty() {
        return Err(FxlabError::NoData {
            symbol: selection.symbol.clone(),
            timeframe: selection.timeframe.clone(),
        });
    }
    eprintln!(
        "Loaded {} bars for {} {} ({} to {})",
        bars.len(),
        selection.symbol,
        selection.timeframe,
        bars[0].time,
        bars[bars.len() - 1].time
    );
    Ok(apply_signals(&bars, rule))
}

/// Fetch, signal, simulate and optionally write the report.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    selection: &DataSelection,
    rule: &SignalRule,
    bt_config: &BacktestConfig,
    output_dir: Option<&Path>,
) -> Result<BacktestResult, FxlabError> {
    let bars = prepare_bars(data_port, selection, rule)?;

    eprintln!(
        "Running {} backtest with {} signals",
        bt_config.exit_rule.name(),
        rule
    );
    let result = backtest_engine::run(&bars, bt_config)?;

    if let Some(dir) = output_dir {
        report_port.write(&result, dir)?;
        eprintln!("\nReport written to: {}", dir.display());
    }
    Ok(result)
}

pub fn print_summary(result: &BacktestResult) {
    let stats = &result.statistics;
    eprintln!("\n=== Results ===");
    eprintln!("Total Profit:     {:.2}", result.total_profit);
    if let Some(pips) = result.total_profit_pips {
        eprintln!("Total Pips:       {:.1}", pips);
    }
    eprintln!("Final Balance:    {:.2}", stats.final_balance);
    eprintln!("Trades:           {}", result.number_of_trades);
    eprintln!("Win Rate:         {:.1}%", result.win_rate * 100.0);
    eprintln!("Average Profit:   {:.2}", result.average_profit);
    eprintln!("Max Drawdown:     {:.2}%", result.max_drawdown * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
    eprintln!("Largest Win:      {:.2}", stats.largest_win);
    eprintln!("Largest Loss:     {:.2}", stats.largest_loss);
    if !result.open_positions.is_empty() {
        eprintln!(
            "Open at end:      {} (not counted)",
            result.open_positions.len()
        );
    }
}

fn output_dir_from(config: &dyn ConfigPort, output_override: Option<&Path>) -> Option<PathBuf> {
    output_override.map(Path::to_path_buf).or_else(|| {
        config
            .get_string("report", "output_dir")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    })
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    timeframe_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), FxlabError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;

    let bt_config = backtest_config_from(&config)?;
    let rule = signal_rule_from(&config)?;
    let selection = resolve_selection(&config, symbol_override, timeframe_override)?;
    let data_port = CsvAdapter::new(data_dir(&config)?);
    let output_dir = output_dir_from(&config, output_path);

    let result = run_backtest_pipeline(
        &data_port,
        &CsvReportAdapter,
        &selection,
        &rule,
        &bt_config,
        output_dir.as_deref(),
    )?;
    print_summary(&result);
    Ok(())
}

pub fn run_dry_run(config_path: &Path) -> Result<(), FxlabError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;

    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;
    eprintln!("Config validated successfully");

    let bt_config = backtest_config_from(&config)?;
    let rule = signal_rule_from(&config)?;
    let selection = data_selection_from(&config)?;

    eprintln!("\nBacktest:");
    eprintln!("  initial balance: {:.2}", bt_config.initial_balance);
    match bt_config.exit_rule {
        ExitRule::SignalReversal { risk_fraction } => {
            eprintln!("  mode: reversal (risk {:.2})", risk_fraction);
        }
        ExitRule::Bracket(p) => {
            eprintln!(
                "  mode: bracket (lot {}, SL {} pips, TP {} pips)",
                p.lot_size, p.stop_loss_pips, p.take_profit_pips
            );
        }
    }
    eprintln!("  force close at end: {}", bt_config.force_close_at_end);

    eprintln!("\nSignals: {}", rule);
    let mut indicator_list: Vec<String> =
        rule.indicators().iter().map(|i| i.to_string()).collect();
    indicator_list.sort();
    indicator_list.dedup();
    for ind in &indicator_list {
        eprintln!("  {}", ind);
    }

    eprintln!("\nData:");
    eprintln!("  {} {}", selection.symbol, selection.timeframe);

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_sweep(
    config_path: &Path,
    symbol_override: Option<&str>,
    timeframe_override: Option<&str>,
    stop_losses: &[f64],
    take_profits: &[f64],
) -> Result<(), FxlabError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;

    let bt_config = backtest_config_from(&config)?;
    let rule = signal_rule_from(&config)?;
    let selection = resolve_selection(&config, symbol_override, timeframe_override)?;
    let data_port = CsvAdapter::new(data_dir(&config)?);

    let bars = prepare_bars(&data_port, &selection, &rule)?;
    let points = sweep_brackets(&bars, &bt_config, stop_losses, take_profits)?;

    eprintln!("\n=== Sweep ===");
    eprintln!(
        "{:>8} {:>8} {:>8} {:>12} {:>8} {:>8}",
        "SL", "TP", "Trades", "Profit", "Win%", "Sharpe"
    );
    for point in &points {
        let r = &point.result;
        eprintln!(
            "{:>8.1} {:>8.1} {:>8} {:>12.2} {:>7.1}% {:>8.2}",
            point.stop_loss_pips,
            point.take_profit_pips,
            r.number_of_trades,
            r.total_profit,
            r.win_rate * 100.0,
            r.sharpe_ratio
        );
    }
    if let Some(best) = best_by_profit(&points) {
        eprintln!(
            "\nBest: SL {} / TP {} ({:.2})",
            best.stop_loss_pips, best.take_profit_pips, best.result.total_profit
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), FxlabError> {
    eprintln!("Validating config: {}", config_path.display());
    let config = load_config(config_path)?;

    validate_backtest_config(&config)?;
    validate_strategy_config(&config)?;
    data_dir(&config)?;

    eprintln!("Signals: {}", signal_rule_from(&config)?);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(config_path: &Path, timeframe: Option<&str>) -> Result<(), FxlabError> {
    let config = load_config(config_path)?;
    let timeframe = match timeframe {
        Some(t) => t.trim().to_uppercase(),
        None => config
            .get_string("data", "timeframe")
            .map(|t| t.trim().to_uppercase())
            .ok_or_else(|| FxlabError::ConfigMissing {
                section: "data".into(),
                key: "timeframe".into(),
            })?,
    };

    let adapter = CsvAdapter::new(data_dir(&config)?);
    let symbols = adapter.list_symbols(&timeframe)?;

    if symbols.is_empty() {
        eprintln!("No symbols found for timeframe {}", timeframe);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
