//! Position state machine.
//!
//! A single machine drives both exit policies:
//! - [`ExitRule::SignalReversal`]: one long position at a time, sized from the
//!   balance at entry, closed on the next sell signal.
//! - [`ExitRule::Bracket`]: every entry signal opens an independent fixed-lot
//!   bracket; brackets close when a later bar touches the stop or the target.
//!
//! The machine is advanced with [`PositionStateMachine::step`], which consumes
//! and returns the state so a run is a plain `try_fold` over the bars.

use chrono::NaiveDateTime;
use log::debug;

use super::bar::{Bar, Signal};
use super::equity::EquityTracker;
use super::error::FxlabError;
use super::ledger::{TradeHandle, TradeLedger};
use super::position::{ExitReason, PipPricing, Position, Side, Trade};

/// Fixed-lot bracket parameters. Distances are in pips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketParams {
    pub lot_size: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    pub pip_size: f64,
    pub pip_value: f64,
}

impl BracketParams {
    pub fn pricing(&self) -> PipPricing {
        PipPricing {
            pip_size: self.pip_size,
            pip_value: self.pip_value,
        }
    }

    /// (stop_loss, take_profit) prices for an entry at `entry_price`.
    pub fn levels(&self, side: Side, entry_price: f64) -> (f64, f64) {
        let sl = self.stop_loss_pips * self.pip_size;
        let tp = self.take_profit_pips * self.pip_size;
        match side {
            Side::Long => (entry_price - sl, entry_price + tp),
            Side::Short => (entry_price + sl, entry_price - tp),
        }
    }
}

/// Exit policy selected when the machine is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitRule {
    SignalReversal { risk_fraction: f64 },
    Bracket(BracketParams),
}

impl ExitRule {
    pub fn validate(&self) -> Result<(), FxlabError> {
        match self {
            ExitRule::SignalReversal { risk_fraction } => {
                require_positive("risk_per_trade", *risk_fraction)
            }
            ExitRule::Bracket(p) => {
                require_positive("lot_size", p.lot_size)?;
                require_positive("stop_loss_pips", p.stop_loss_pips)?;
                require_positive("take_profit_pips", p.take_profit_pips)?;
                require_positive("pip_size", p.pip_size)?;
                require_positive("pip_value", p.pip_value)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExitRule::SignalReversal { .. } => "reversal",
            ExitRule::Bracket(_) => "bracket",
        }
    }
}

fn require_positive(key: &str, value: f64) -> Result<(), FxlabError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FxlabError::invalid(
            "backtest",
            key,
            format!("{key} must be a positive number"),
        ))
    }
}

/// Single-position state used by the reversal policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long(TradeHandle),
}

#[derive(Debug, Clone, PartialEq)]
enum Book {
    Reversal {
        risk_fraction: f64,
        state: PositionState,
    },
    Bracket {
        params: BracketParams,
        open: Vec<TradeHandle>,
    },
}

/// Ledger plus equity, kept in lockstep: every close feeds the tracker.
#[derive(Debug, Clone, PartialEq)]
struct Accounts {
    ledger: TradeLedger,
    equity: EquityTracker,
}

impl Accounts {
    fn open(&mut self, position: Position) -> TradeHandle {
        debug!(
            "open {} #{} at {} size {:.4} ({})",
            position.side,
            self.ledger.next_id(),
            position.entry_price,
            position.size,
            position.entry_time
        );
        self.ledger.record_entry(position)
    }

    fn close(
        &mut self,
        handle: TradeHandle,
        exit_price: f64,
        exit_time: NaiveDateTime,
        reason: ExitReason,
    ) -> Result<(), FxlabError> {
        let trade = self
            .ledger
            .record_exit(handle, exit_price, exit_time, reason)?;
        debug!(
            "close #{} at {} ({}) profit {:.2}",
            trade.id, exit_price, reason, trade.profit_amount
        );
        self.equity.on_trade_closed(trade.profit_amount);
        Ok(())
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub trades: Vec<Trade>,
    pub open_positions: Vec<Position>,
    pub equity_curve: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionStateMachine {
    book: Book,
    accounts: Accounts,
    last_bar: Option<(NaiveDateTime, f64)>,
}

impl PositionStateMachine {
    pub fn new(rule: ExitRule, initial_balance: f64) -> Self {
        let book = match rule {
            ExitRule::SignalReversal { risk_fraction } => Book::Reversal {
                risk_fraction,
                state: PositionState::Flat,
            },
            ExitRule::Bracket(params) => Book::Bracket {
                params,
                open: Vec::new(),
            },
        };
        PositionStateMachine {
            book,
            accounts: Accounts {
                ledger: TradeLedger::new(),
                equity: EquityTracker::new(initial_balance),
            },
            last_bar: None,
        }
    }

    pub fn balance(&self) -> f64 {
        self.accounts.equity.balance
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.accounts.ledger
    }

    pub fn equity_curve(&self) -> &[f64] {
        &self.accounts.equity.curve
    }

    /// Reversal state; `None` for the bracket policy.
    pub fn position_state(&self) -> Option<PositionState> {
        match &self.book {
            Book::Reversal { state, .. } => Some(*state),
            Book::Bracket { .. } => None,
        }
    }

    pub fn open_count(&self) -> usize {
        match &self.book {
            Book::Reversal { state, .. } => match state {
                PositionState::Flat => 0,
                PositionState::Long(_) => 1,
            },
            Book::Bracket { open, .. } => open.len(),
        }
    }

    /// Advances the machine by one bar.
    pub fn step(mut self, bar: &Bar) -> Result<Self, FxlabError> {
        match &mut self.book {
            Book::Reversal {
                risk_fraction,
                state,
            } => step_reversal(bar, *risk_fraction, state, &mut self.accounts)?,
            Book::Bracket { params, open } => {
                step_bracket(bar, params, open, &mut self.accounts)?
            }
        }
        self.last_bar = Some((bar.time, bar.close));
        Ok(self)
    }

    /// Ends the run. With `force_close`, every still-open trade is closed at
    /// the last bar's close so it counts toward the statistics.
    pub fn finish(mut self, force_close: bool) -> Result<RunOutcome, FxlabError> {
        if force_close {
            if let Some((time, close)) = self.last_bar {
                let handles = match &mut self.book {
                    Book::Reversal { state, .. } => {
                        match std::mem::replace(state, PositionState::Flat) {
                            PositionState::Long(h) => vec![h],
                            PositionState::Flat => Vec::new(),
                        }
                    }
                    Book::Bracket { open, .. } => std::mem::take(open),
                };
                for handle in handles {
                    self.accounts
                        .close(handle, close, time, ExitReason::EndOfData)?;
                }
            }
        }

        let Accounts { ledger, equity } = self.accounts;
        let (trades, open_positions) = ledger.into_parts();
        Ok(RunOutcome {
            trades,
            open_positions,
            equity_curve: equity.into_curve(),
        })
    }
}

fn step_reversal(
    bar: &Bar,
    risk_fraction: f64,
    state: &mut PositionState,
    accounts: &mut Accounts,
) -> Result<(), FxlabError> {
    match *state {
        PositionState::Flat if bar.entry_signal == Some(Signal::Buy) => {
            let size = accounts.equity.balance * risk_fraction / bar.close;
            let handle = accounts.open(Position {
                id: accounts.ledger.next_id(),
                side: Side::Long,
                entry_price: bar.close,
                entry_time: bar.time,
                size,
                stop_loss: None,
                take_profit: None,
                pricing: None,
            });
            *state = PositionState::Long(handle);
        }
        PositionState::Long(handle) if bar.exit_signal == Some(Signal::Sell) => {
            accounts.close(handle, bar.close, bar.time, ExitReason::SignalReversal)?;
            *state = PositionState::Flat;
        }
        _ => {}
    }
    Ok(())
}

fn step_bracket(
    bar: &Bar,
    params: &BracketParams,
    open: &mut Vec<TradeHandle>,
    accounts: &mut Accounts,
) -> Result<(), FxlabError> {
    // Exits first: a bracket is only checked on bars after the one that opened it.
    let mut still_open = Vec::with_capacity(open.len());
    for &handle in open.iter() {
        let position = accounts
            .ledger
            .position(handle)
            .ok_or(FxlabError::TradeAlreadyClosed { id: handle.id() })?;

        // Stop-loss wins when one bar spans both levels.
        let exit = if position.should_stop_loss(bar) {
            position.stop_loss.map(|p| (p, ExitReason::StopLoss))
        } else if position.should_take_profit(bar) {
            position.take_profit.map(|p| (p, ExitReason::TakeProfit))
        } else {
            None
        };

        match exit {
            Some((price, reason)) => accounts.close(handle, price, bar.time, reason)?,
            None => still_open.push(handle),
        }
    }
    *open = still_open;

    // A buy in the entry column opens a long; a sell in either column opens
    // a short. One bar can open both when the columns disagree.
    if bar.entry_signal == Some(Signal::Buy) {
        open_bracket(Side::Long, bar, params, open, accounts);
    }
    if bar.entry_signal == Some(Signal::Sell) || bar.exit_signal == Some(Signal::Sell) {
        open_bracket(Side::Short, bar, params, open, accounts);
    }
    Ok(())
}

fn open_bracket(
    side: Side,
    bar: &Bar,
    params: &BracketParams,
    open: &mut Vec<TradeHandle>,
    accounts: &mut Accounts,
) {
    let (stop_loss, take_profit) = params.levels(side, bar.close);
    let handle = accounts.open(Position {
        id: accounts.ledger.next_id(),
        side,
        entry_price: bar.close,
        entry_time: bar.time,
        size: params.lot_size,
        stop_loss: Some(stop_loss),
        take_profit: Some(take_profit),
        pricing: Some(params.pricing()),
    });
    open.push(handle);
}
