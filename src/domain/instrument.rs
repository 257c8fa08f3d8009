//! Instruments, lot size and the price tables used by the simulator and
//! the paper portfolio.
//!
//! Prices here are stand-ins for a real market-data feed. They live in an
//! explicit [`PriceTable`] handed to the callers so tests and configs can
//! override them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::FxlabError;

/// Units per standard FX lot.
pub const LOT_SIZE: f64 = 100_000.0;

/// Currency pairs the dashboard offers.
pub const CURRENCY_PAIRS: [&str; 5] = ["EURUSD", "GBPUSD", "USDJPY", "XAUUSD", "BTCUSD"];

/// Simulator base price for any pair without an explicit entry.
pub const DEFAULT_BASE_PRICE: f64 = 1.08;

pub fn is_supported_pair(pair: &str) -> bool {
    CURRENCY_PAIRS.contains(&pair)
}

/// Normalise a user-supplied pair (`eur/usd` -> `EURUSD`) and check it is supported.
pub fn parse_pair(raw: &str) -> Result<String, FxlabError> {
    let pair: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if is_supported_pair(&pair) {
        Ok(pair)
    } else {
        Err(FxlabError::invalid_config(
            "currency_pair",
            format!(
                "unsupported pair '{}', expected one of {}",
                raw.trim(),
                CURRENCY_PAIRS.join(", ")
            ),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    /// Reference level the backtest simulator jitters entries around.
    base: BTreeMap<String, f64>,
    /// Current quote used to mark or close paper trades.
    mark: BTreeMap<String, f64>,
}

impl PriceTable {
    pub fn empty() -> Self {
        PriceTable {
            base: BTreeMap::new(),
            mark: BTreeMap::new(),
        }
    }

    pub fn with_base(mut self, pair: &str, price: f64) -> Self {
        self.base.insert(pair.to_string(), price);
        self
    }

    pub fn with_mark(mut self, pair: &str, price: f64) -> Self {
        self.mark.insert(pair.to_string(), price);
        self
    }

    pub fn set_base(&mut self, pair: &str, price: f64) {
        self.base.insert(pair.to_string(), price);
    }

    pub fn set_mark(&mut self, pair: &str, price: f64) {
        self.mark.insert(pair.to_string(), price);
    }

    pub fn base_price(&self, pair: &str) -> f64 {
        self.base.get(pair).copied().unwrap_or(DEFAULT_BASE_PRICE)
    }

    pub fn mark_price(&self, pair: &str) -> Option<f64> {
        self.mark.get(pair).copied()
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        PriceTable::empty()
            .with_base("XAUUSD", 2000.0)
            .with_base("BTCUSD", 40_000.0)
            .with_mark("EURUSD", 1.0852)
            .with_mark("GBPUSD", 1.2648)
            .with_mark("USDJPY", 149.85)
            .with_mark("XAUUSD", 2045.50)
            .with_mark("BTCUSD", 43_250.0)
    }
}
