//! CSV file data adapter.
//!
//! Reads `<dir>/<SYMBOL>_<TIMEFRAME>.csv`. Columns are located by header
//! name: `time`, `open`, `high`, `low`, `close` are required; `tick_volume`,
//! `entry_signal` and `exit_signal` are optional. A single `signal` column
//! fills both signal slots. Empty signal cells are null.
//!
//! Signal cells are `buy`/`sell`/`hold` (or `1`/`-1`/`0`). The separate
//! columns also take boolean flags: a true entry flag is a buy, a true exit
//! flag a sell.

use crate::domain::bar::{Bar, Signal, SignalColumn};
use crate::domain::error::FxlabError;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use log::{debug, warn};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    tick_volume: Option<usize>,
    entry_signal: Option<(usize, SignalColumn)>,
    exit_signal: Option<(usize, SignalColumn)>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, FxlabError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| FxlabError::DataSource {
                reason: format!("missing {} column", name),
            })
        };

        let shared_signal = find("signal").map(|i| (i, SignalColumn::Shared));
        Ok(Columns {
            time: require("time")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            tick_volume: find("tick_volume"),
            entry_signal: find("entry_signal")
                .map(|i| (i, SignalColumn::Entry))
                .or(shared_signal),
            exit_signal: find("exit_signal")
                .map(|i| (i, SignalColumn::Exit))
                .or(shared_signal),
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe))
    }
}

/// Unix seconds, `YYYY-MM-DD HH:MM:SS`, or a bare `YYYY-MM-DD`.
pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_price(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<f64, FxlabError> {
    record
        .get(index)
        .ok_or_else(|| FxlabError::DataSource {
            reason: format!("line {}: missing {} value", line, name),
        })?
        .trim()
        .parse()
        .map_err(|e| FxlabError::DataSource {
            reason: format!("line {}: invalid {} value: {}", line, name, e),
        })
}

fn parse_signal(
    record: &StringRecord,
    column: Option<(usize, SignalColumn)>,
    line: usize,
) -> Result<Option<Signal>, FxlabError> {
    let Some((index, role)) = column else {
        return Ok(None);
    };
    match record.get(index).map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Signal::parse_in(s, role)
            .map(Some)
            .map_err(|e| FxlabError::DataSource {
                reason: format!("line {}: {}", line, e),
            }),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, FxlabError> {
        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| FxlabError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| FxlabError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let line = row + 2;
            let record = result.map_err(|e| FxlabError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let time_str = record.get(columns.time).unwrap_or_default();
            let time = parse_time(time_str).ok_or_else(|| FxlabError::DataSource {
                reason: format!("line {}: invalid time '{}'", line, time_str),
            })?;

            let date = time.date();
            if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
                continue;
            }

            let tick_volume = match columns.tick_volume.and_then(|i| record.get(i)) {
                Some(v) if !v.trim().is_empty() => match v.trim().parse::<f64>() {
                    Ok(v) => Some(v as i64),
                    Err(_) => {
                        warn!("line {}: ignoring unreadable tick_volume '{}'", line, v);
                        None
                    }
                },
                _ => None,
            };

            bars.push(Bar {
                time,
                open: parse_price(&record, columns.open, "open", line)?,
                high: parse_price(&record, columns.high, "high", line)?,
                low: parse_price(&record, columns.low, "low", line)?,
                close: parse_price(&record, columns.close, "close", line)?,
                tick_volume,
                entry_signal: parse_signal(&record, columns.entry_signal, line)?,
                exit_signal: parse_signal(&record, columns.exit_signal, line)?,
            });
        }

        bars.sort_by_key(|b| b.time);
        debug!(
            "loaded {} bars for {}_{} from {}",
            bars.len(),
            symbol,
            timeframe,
            path.display()
        );
        Ok(bars)
    }

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, FxlabError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FxlabError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", timeframe);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| FxlabError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
