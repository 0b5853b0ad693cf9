//! Append-only trade ledger.
//!
//! Entries are kept in the order they were opened. A handle returned by
//! [`TradeLedger::record_entry`] can be closed exactly once.

use chrono::NaiveDateTime;

use super::error::FxlabError;
use super::position::{ExitReason, Position, Trade};

/// Opaque reference to a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TradeHandle(usize);

impl TradeHandle {
    pub fn id(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Open(Position),
    Closed(Trade),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLedger {
    entries: Vec<Entry>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next recorded position will receive.
    pub fn next_id(&self) -> usize {
        self.entries.len()
    }

    /// Records an opened position. The position's id is overwritten with the
    /// ledger slot so ids and handles always agree.
    pub fn record_entry(&mut self, mut position: Position) -> TradeHandle {
        let handle = TradeHandle(self.entries.len());
        position.id = handle.0;
        self.entries.push(Entry::Open(position));
        handle
    }

    pub fn record_exit(
        &mut self,
        handle: TradeHandle,
        exit_price: f64,
        exit_time: NaiveDateTime,
        exit_reason: ExitReason,
    ) -> Result<&Trade, FxlabError> {
        let entry = self
            .entries
            .get_mut(handle.0)
            .ok_or(FxlabError::UnknownTrade { id: handle.0 })?;

        let trade = match entry {
            Entry::Open(position) => position.close(exit_price, exit_time, exit_reason),
            Entry::Closed(_) => return Err(FxlabError::TradeAlreadyClosed { id: handle.0 }),
        };
        *entry = Entry::Closed(trade);

        match entry {
            Entry::Closed(trade) => Ok(trade),
            Entry::Open(_) => unreachable!("entry was just closed"),
        }
    }

    pub fn position(&self, handle: TradeHandle) -> Option<&Position> {
        match self.entries.get(handle.0)? {
            Entry::Open(position) => Some(position),
            Entry::Closed(_) => None,
        }
    }

    /// Closed trades in entry order.
    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Closed(trade) => Some(trade),
            Entry::Open(_) => None,
        })
    }

    /// Still-open positions in entry order.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Open(position) => Some(position),
            Entry::Closed(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Trade>, Vec<Position>) {
        let mut closed = Vec::new();
        let mut open = Vec::new();
        for entry in self.entries {
            match entry {
                Entry::Closed(trade) => closed.push(trade),
                Entry::Open(position) => open.push(position),
            }
        }
        (closed, open)
    }
}
