//! Price data access port trait.

use crate::domain::bar::Bar;
use crate::domain::error::FxlabError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` on `timeframe`, sorted by time. `start` and `end`
    /// are inclusive calendar dates; `None` leaves that side open.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, FxlabError>;

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, FxlabError>;
}
