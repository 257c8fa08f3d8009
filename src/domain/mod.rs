//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod instrument;
pub mod metrics;
pub mod portfolio;
pub mod random;
pub mod shared_portfolio;
pub mod strategy;
pub mod trade;
