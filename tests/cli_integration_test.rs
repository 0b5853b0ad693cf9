//! CLI integration tests.
//!
//! Tests cover:
//! - Config translation (backtest, data selection, signal rule)
//! - Command-line overrides of `[data]`
//! - Every subcommand against real INI and CSV files on disk
//! - Error family per failure mode

mod common;

use clap::Parser;
use fxlab::adapters::file_config_adapter::FileConfigAdapter;
use fxlab::cli::{self, Cli};
use fxlab::domain::config_validation::backtest_config_from;
use fxlab::domain::engine::ExitRule;
use fxlab::domain::error::FxlabError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BARS_CSV: &str = "time,open,high,low,close,tick_volume,entry_signal,exit_signal\n\
2024-01-01 00:00:00,1.1000,1.1005,1.0995,1.1000,100,hold,hold\n\
2024-01-01 01:00:00,1.1000,1.1010,1.0990,1.1000,100,buy,buy\n\
2024-01-01 02:00:00,1.1000,1.1120,1.0990,1.1110,100,hold,hold\n\
2024-01-01 03:00:00,1.1110,1.1115,1.1040,1.1050,100,sell,sell\n\
2024-01-01 04:00:00,1.1050,1.1060,1.0990,1.1000,100,hold,hold\n";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("EURUSD_H1.csv"), BARS_CSV).unwrap();
        fs::write(data.join("GBPUSD_H1.csv"), BARS_CSV).unwrap();
        Fixture { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write_config(&self, backtest: &str, extra: &str) -> String {
        let content = format!(
            "[backtest]\n{backtest}\n\n[data]\npath = {}\nsymbol = EURUSD\ntimeframe = H1\n\n{extra}\n",
            self.path().join("data").display()
        );
        let file = self.path().join("fxlab.ini");
        fs::write(&file, content).unwrap();
        file.display().to_string()
    }
}

fn run_args(args: &[&str]) -> Result<(), FxlabError> {
    let mut argv = vec!["fxlab"];
    argv.extend_from_slice(args);
    cli::execute(Cli::try_parse_from(argv).unwrap())
}

mod config_loading {
    use super::*;

    #[test]
    fn backtest_config_reads_bracket_section() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\nmode = bracket\nstop_loss_pips = 25\ntake_profit_pips = 75\n",
        )
        .unwrap();
        let config = backtest_config_from(&adapter).unwrap();
        match config.exit_rule {
            ExitRule::Bracket(p) => {
                assert!((p.stop_loss_pips - 25.0).abs() < f64::EPSILON);
                assert!((p.take_profit_pips - 75.0).abs() < f64::EPSILON);
            }
            other => panic!("expected bracket, got {other:?}"),
        }
    }

    #[test]
    fn overrides_replace_data_keys() {
        let adapter = FileConfigAdapter::from_string(
            "[data]\npath = /tmp\nsymbol = EURUSD\ntimeframe = H1\n",
        )
        .unwrap();
        let selection = cli::resolve_selection(&adapter, Some("gbpusd"), None).unwrap();
        assert_eq!(selection.symbol, "GBPUSD");
        assert_eq!(selection.timeframe, "H1");
    }

    #[test]
    fn overrides_fill_missing_data_keys() {
        let adapter = FileConfigAdapter::from_string("[data]\npath = /tmp\n").unwrap();
        let selection = cli::resolve_selection(&adapter, Some("USDJPY"), Some("m15")).unwrap();
        assert_eq!(selection.symbol, "USDJPY");
        assert_eq!(selection.timeframe, "M15");
    }

    #[test]
    fn missing_symbol_without_override() {
        let adapter = FileConfigAdapter::from_string("[data]\ntimeframe = H1\n").unwrap();
        let err = cli::resolve_selection(&adapter, None, None).unwrap_err();
        assert!(matches!(err, FxlabError::ConfigMissing { ref key, .. } if key == "symbol"));
    }

    #[test]
    fn data_dir_required() {
        let adapter = FileConfigAdapter::from_string("[data]\nsymbol = EURUSD\n").unwrap();
        let err = cli::data_dir(&adapter).unwrap_err();
        assert!(matches!(err, FxlabError::ConfigMissing { ref key, .. } if key == "path"));
    }

    #[test]
    fn load_config_missing_file_is_parse_error() {
        let err = cli::load_config(Path::new("/nonexistent/fxlab.ini")).unwrap_err();
        assert!(matches!(err, FxlabError::ConfigParse { .. }));
    }
}

mod commands {
    use super::*;

    #[test]
    fn backtest_writes_report() {
        let fixture = Fixture::new();
        let config = fixture.write_config("initial_balance = 10000", "");
        let out = fixture.path().join("out");

        let code = run_args(&[
            "backtest",
            "--config",
            &config,
            "--output",
            out.to_str().unwrap(),
        ]);
        code.unwrap();

        let trades = fs::read_to_string(out.join("trades.csv")).unwrap();
        assert_eq!(trades.lines().count(), 2);
        assert!(trades.contains("signal_reversal"));
        let equity = fs::read_to_string(out.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), 3);
    }

    #[test]
    fn backtest_bracket_mode_report_from_config() {
        let fixture = Fixture::new();
        let out = fixture.path().join("bracket-out");
        let config = fixture.write_config(
            "mode = bracket",
            &format!("[report]\noutput_dir = {}\n", out.display()),
        );

        let code = run_args(&["backtest", "--config", &config]);
        code.unwrap();

        // Long at 1.1000 hits TP 1.1100 on the next bar.
        let trades = fs::read_to_string(out.join("trades.csv")).unwrap();
        assert!(trades.contains("take_profit"));
    }

    #[test]
    fn backtest_with_symbol_override() {
        let fixture = Fixture::new();
        let config = fixture.write_config("", "");
        let code = run_args(&["backtest", "--config", &config, "--symbol", "GBPUSD"]);
        code.unwrap();
    }

    #[test]
    fn backtest_unknown_symbol_is_data_source_error() {
        let fixture = Fixture::new();
        let config = fixture.write_config("", "");
        let code = run_args(&["backtest", "--config", &config, "--symbol", "XAUUSD"]);
        assert!(matches!(code, Err(FxlabError::DataSource { .. })));
    }

    #[test]
    fn backtest_empty_range_is_no_data() {
        let fixture = Fixture::new();
        let config = fixture.write_config("", "");
        let content = fs::read_to_string(&config)
            .unwrap()
            .replace("timeframe = H1\n", "timeframe = H1\nstart = 2030-01-01\n");
        fs::write(&config, content).unwrap();

        let code = run_args(&["backtest", "--config", &config]);
        assert!(matches!(code, Err(FxlabError::NoData { .. })));
    }

    #[test]
    fn backtest_invalid_mode_is_config_error() {
        let fixture = Fixture::new();
        let config = fixture.write_config("mode = martingale", "");
        let code = run_args(&["backtest", "--config", &config]);
        assert!(matches!(code, Err(FxlabError::ConfigInvalid { ref key, .. }) if key == "mode"));
    }

    #[test]
    fn backtest_null_signals_is_malformed() {
        let fixture = Fixture::new();
        fs::write(
            fixture.path().join("data").join("EURUSD_H1.csv"),
            "time,open,high,low,close\n2024-01-01,1.1,1.1,1.1,1.1\n2024-01-02,1.2,1.2,1.2,1.2\n",
        )
        .unwrap();
        let config = fixture.write_config("", "");
        let code = run_args(&["backtest", "--config", &config]);
        assert!(matches!(code, Err(FxlabError::MalformedInput { .. })));
    }

    #[test]
    fn backtest_with_generated_signals() {
        let fixture = Fixture::new();
        let config = fixture.write_config(
            "",
            "[strategy]\nsignal = ma_trend\nshort_period = 1\nlong_period = 2\n",
        );
        let code = run_args(&["backtest", "--config", &config]);
        code.unwrap();
    }

    #[test]
    fn dry_run_needs_no_data() {
        let fixture = Fixture::new();
        let config = fixture.write_config("mode = bracket", "[strategy]\nsignal = fibonacci\n");
        fs::remove_dir_all(fixture.path().join("data")).unwrap();
        let code = run_args(&["backtest", "--config", &config, "--dry-run"]);
        code.unwrap();
    }

    #[test]
    fn sweep_runs_grid() {
        let fixture = Fixture::new();
        let config = fixture.write_config("mode = bracket", "");
        let code = run_args(&[
            "sweep",
            "--config",
            &config,
            "--stop-loss",
            "30,50",
            "--take-profit",
            "60,100",
        ]);
        code.unwrap();
    }

    #[test]
    fn sweep_rejects_reversal_mode() {
        let fixture = Fixture::new();
        let config = fixture.write_config("mode = reversal", "");
        let code = run_args(&[
            "sweep",
            "--config",
            &config,
            "--stop-loss",
            "30",
            "--take-profit",
            "60",
        ]);
        assert!(matches!(code, Err(FxlabError::ConfigInvalid { ref key, .. }) if key == "mode"));
    }

    #[test]
    fn sweep_requires_grid_arguments() {
        let parsed = Cli::try_parse_from(["fxlab", "sweep", "--config", "x.ini"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_accepts_good_config() {
        let fixture = Fixture::new();
        let config = fixture.write_config("", "[strategy]\nsignal = rsi\n");
        run_args(&["validate", "--config", &config]).unwrap();
    }

    #[test]
    fn validate_rejects_bad_strategy() {
        let fixture = Fixture::new();
        let config = fixture.write_config("", "[strategy]\nsignal = rsi\nrsi_buy = 80\nrsi_sell = 20\n");
        let err = run_args(&["validate", "--config", &config]).unwrap_err();
        assert!(matches!(err, FxlabError::ConfigInvalid { ref key, .. } if key == "rsi_buy"));
    }

    #[test]
    fn validate_missing_file() {
        let err = run_args(&["validate", "--config", "/nonexistent/fxlab.ini"]).unwrap_err();
        assert!(matches!(err, FxlabError::ConfigParse { .. }));
    }

    #[test]
    fn list_symbols_uses_config_timeframe() {
        let fixture = Fixture::new();
        let config = fixture.write_config("", "");
        run_args(&["list-symbols", "--config", &config]).unwrap();
        run_args(&["list-symbols", "--config", &config, "--timeframe", "D1"]).unwrap();
    }
}
