//! CSV report writer.
//!
//! Writes `trades.csv` (one row per closed trade), `equity.csv` (balance
//! after each close, starting with the initial balance) and
//! `open_positions.csv` into the output directory.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FxlabError;
use crate::domain::position::{Position, Trade};
use crate::ports::report_port::ReportPort;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::Path;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct TradeRow {
    id: usize,
    side: String,
    entry_time: String,
    entry_price: f64,
    size: f64,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
    exit_time: String,
    exit_price: f64,
    exit_reason: String,
    profit_amount: f64,
    profit_pips: Option<f64>,
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        TradeRow {
            id: trade.id,
            side: trade.side.to_string(),
            entry_time: trade.entry_time.format(TIME_FORMAT).to_string(),
            entry_price: trade.entry_price,
            size: trade.size,
            stop_loss: trade.stop_loss,
            take_profit: trade.take_profit,
            exit_time: trade.exit_time.format(TIME_FORMAT).to_string(),
            exit_price: trade.exit_price,
            exit_reason: trade.exit_reason.to_string(),
            profit_amount: trade.profit_amount,
            profit_pips: trade.profit_pips,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenRow {
    id: usize,
    side: String,
    entry_time: String,
    entry_price: f64,
    size: f64,
    stop_loss: Option<f64>,
    take_profit: Option<f64>,
}

impl From<&Position> for OpenRow {
    fn from(position: &Position) -> Self {
        OpenRow {
            id: position.id,
            side: position.side.to_string(),
            entry_time: position.entry_time.format(TIME_FORMAT).to_string(),
            entry_price: position.entry_price,
            size: position.size,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
        }
    }
}

#[derive(Debug, Serialize)]
struct EquityRow {
    index: usize,
    balance: f64,
}

pub struct CsvReportAdapter;

fn report_err(path: &Path, e: impl std::fmt::Display) -> FxlabError {
    FxlabError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), FxlabError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| report_err(path, e))?;
    }
    writer.flush().map_err(|e| report_err(path, e))
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), FxlabError> {
        fs::create_dir_all(output_dir).map_err(|e| report_err(output_dir, e))?;

        write_rows(
            &output_dir.join("trades.csv"),
            result.trade_log.iter().map(TradeRow::from),
        )?;
        write_rows(
            &output_dir.join("equity.csv"),
            result
                .equity_curve
                .iter()
                .enumerate()
                .map(|(index, &balance)| EquityRow { index, balance }),
        )?;
        write_rows(
            &output_dir.join("open_positions.csv"),
            result.open_positions.iter().map(OpenRow::from),
        )?;

        info!(
            "wrote {} trades and {} equity points to {}",
            result.trade_log.len(),
            result.equity_curve.len(),
            output_dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, run};
    use crate::domain::bar::{Bar, Signal};
    use crate::domain::engine::ExitRule;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let t = |h: u32| {
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let bars = vec![
            Bar::new(t(0), 1.10, 1.10, 1.10, 1.10).with_signal(Some(Signal::Buy)),
            Bar::new(t(1), 1.12, 1.12, 1.12, 1.12).with_signal(Some(Signal::Sell)),
            Bar::new(t(2), 1.11, 1.11, 1.11, 1.11).with_signal(Some(Signal::Buy)),
        ];
        let config = BacktestConfig {
            initial_balance: 10_000.0,
            exit_rule: ExitRule::SignalReversal { risk_fraction: 1.0 },
            force_close_at_end: false,
        };
        run(&bars, &config).unwrap()
    }

    #[test]
    fn writes_trades_and_equity() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report");
        CsvReportAdapter.write(&sample_result(), &out).unwrap();

        let trades = fs::read_to_string(out.join("trades.csv")).unwrap();
        let mut lines = trades.lines();
        assert!(lines.next().unwrap().starts_with("id,side,entry_time"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("0,long,2024-01-01 00:00:00"));
        assert!(row.contains("signal_reversal"));
        assert!(lines.next().is_none());

        let equity = fs::read_to_string(out.join("equity.csv")).unwrap();
        let rows: Vec<&str> = equity.lines().collect();
        assert_eq!(rows[0], "index,balance");
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("0,10000"));

        let open = fs::read_to_string(out.join("open_positions.csv")).unwrap();
        assert_eq!(open.lines().count(), 2);
    }

    #[test]
    fn unwritable_directory_is_report_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = CsvReportAdapter
            .write(&sample_result(), &blocker.join("nested"))
            .unwrap_err();
        assert!(matches!(err, FxlabError::Report { .. }));
    }
}
