//! Core domain types and logic.

pub mod bar;
pub mod position;
pub mod ledger;
pub mod equity;
pub mod engine;
pub mod backtest;
pub mod metrics;
pub mod indicator;
pub mod signals;
pub mod sweep;
pub mod config_validation;
pub mod error;
