//! Trade records: simulated backtest fills and paper trades (open/closed/cancelled).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::FxlabError;
use super::instrument::LOT_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }

    /// Signed price move in the trade's favour.
    pub fn price_diff(&self, entry_price: f64, exit_price: f64) -> f64 {
        match self {
            TradeType::Buy => exit_price - entry_price,
            TradeType::Sell => entry_price - exit_price,
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = FxlabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "long" => Ok(TradeType::Buy),
            "sell" | "short" => Ok(TradeType::Sell),
            other => Err(FxlabError::invalid_config(
                "trade_type",
                format!("expected buy or sell, got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
    Cancelled,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
            TradeStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Open)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthetic fill produced by the backtest simulator.
///
/// `exit_price` is illustrative only: `profit` comes from the risk/reward
/// formula, not from the entry/exit spread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub entry_price: f64,
    pub exit_price: f64,
    pub profit: f64,
}

impl SimulatedTrade {
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }
}

/// Realised P&L of a position of `quantity` lots moving from entry to exit.
pub fn lot_pnl(trade_type: TradeType, quantity: f64, entry_price: f64, exit_price: f64) -> f64 {
    trade_type.price_diff(entry_price, exit_price) * quantity * LOT_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTrade {
    pub id: u64,
    pub currency_pair: String,
    pub trade_type: TradeType,
    /// Size in standard lots.
    pub quantity: f64,
    pub entry_price: f64,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    pub exit_price: Option<f64>,
    pub profit_loss: Option<f64>,
    pub status: TradeStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl PaperTrade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        lot_pnl(self.trade_type, self.quantity, self.entry_price, mark_price)
    }
}
