//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FxlabError;
use std::path::Path;

/// Port for persisting a finished backtest.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), FxlabError>;
}
