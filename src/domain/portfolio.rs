//! Paper-trading portfolio: cash balance, realised P&L counters and the
//! trade ledger.
//!
//! Every mutating operation validates first and only then touches state, so a
//! returned error always leaves the portfolio exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::FxlabError;
use super::instrument::{LOT_SIZE, PriceTable, is_supported_pair};
use super::trade::{PaperTrade, TradeStatus, TradeType, lot_pnl};

/// Balance a fresh paper account starts with.
pub const DEFAULT_INITIAL_BALANCE: f64 = 10_000.0;

/// Parameters for opening a paper trade.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTrade {
    pub currency_pair: String,
    pub trade_type: TradeType,
    pub quantity: f64,
    pub entry_price: f64,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl OpenTrade {
    pub fn new(currency_pair: &str, trade_type: TradeType, quantity: f64, entry_price: f64) -> Self {
        OpenTrade {
            currency_pair: currency_pair.to_string(),
            trade_type,
            quantity,
            entry_price,
            take_profit: None,
            stop_loss: None,
        }
    }

    pub fn with_take_profit(mut self, level: f64) -> Self {
        self.take_profit = Some(level);
        self
    }

    pub fn with_stop_loss(mut self, level: f64) -> Self {
        self.stop_loss = Some(level);
        self
    }

    fn validate(&self) -> Result<(), FxlabError> {
        if !is_supported_pair(&self.currency_pair) {
            return Err(FxlabError::invalid_config(
                "currency_pair",
                format!("unsupported pair '{}'", self.currency_pair),
            ));
        }
        require_positive("quantity", self.quantity)?;
        require_positive("entry_price", self.entry_price)?;
        if let Some(level) = self.take_profit {
            require_positive("take_profit", level)?;
        }
        if let Some(level) = self.stop_loss {
            require_positive("stop_loss", level)?;
        }
        Ok(())
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), FxlabError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FxlabError::invalid_config(
            field,
            format!("{field} must be a positive number"),
        ))
    }
}

/// Notional value of `quantity` lots at `price`.
pub fn estimated_value(quantity: f64, price: f64) -> f64 {
    quantity * price * LOT_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub balance: f64,
    pub total_profit: f64,
    /// Realised P&L as a percent of the initial balance.
    pub pnl_pct: f64,
    pub open_trades: usize,
    pub closed_trades: usize,
    pub winning_trades: usize,
    /// Percent of closed trades that won, 0-100.
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub initial_balance: f64,
    pub balance: f64,
    pub total_profit: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    trades: Vec<PaperTrade>,
    next_id: u64,
}

impl Portfolio {
    pub fn new(initial_balance: f64) -> Result<Self, FxlabError> {
        require_positive("initial_balance", initial_balance)?;
        Ok(Portfolio {
            initial_balance,
            balance: initial_balance,
            total_profit: 0.0,
            total_trades: 0,
            winning_trades: 0,
            trades: Vec::new(),
            next_id: 1,
        })
    }

    /// Trade ids must be unique and below `next_id`. State read back from
    /// storage is checked with this before use.
    pub fn check_ids(&self) -> Result<(), FxlabError> {
        let mut seen = std::collections::BTreeSet::new();
        for trade in &self.trades {
            if !seen.insert(trade.id) {
                return Err(FxlabError::invalid_config(
                    "trades",
                    format!("duplicate trade id {}", trade.id),
                ));
            }
        }
        match seen.last() {
            Some(&max) if self.next_id <= max => Err(FxlabError::invalid_config(
                "next_id",
                format!("next_id {} does not exceed highest trade id {max}", self.next_id),
            )),
            _ if self.next_id == 0 => Err(FxlabError::invalid_config(
                "next_id",
                "next_id must be at least 1",
            )),
            _ => Ok(()),
        }
    }

    pub fn trades(&self) -> &[PaperTrade] {
        &self.trades
    }

    pub fn trade(&self, id: u64) -> Option<&PaperTrade> {
        self.trades.iter().find(|t| t.id == id)
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &PaperTrade> {
        self.trades_with_status(TradeStatus::Open)
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &PaperTrade> {
        self.trades_with_status(TradeStatus::Closed)
    }

    fn trades_with_status(&self, status: TradeStatus) -> impl Iterator<Item = &PaperTrade> {
        self.trades.iter().filter(move |t| t.status == status)
    }

    /// Record a new open trade. The balance is untouched until the trade closes.
    pub fn open_trade(&mut self, request: OpenTrade) -> Result<PaperTrade, FxlabError> {
        self.open_trade_at(request, Utc::now())
    }

    pub fn open_trade_at(
        &mut self,
        request: OpenTrade,
        opened_at: DateTime<Utc>,
    ) -> Result<PaperTrade, FxlabError> {
        request.validate()?;

        let trade = PaperTrade {
            id: self.next_id,
            currency_pair: request.currency_pair,
            trade_type: request.trade_type,
            quantity: request.quantity,
            entry_price: request.entry_price,
            take_profit: request.take_profit,
            stop_loss: request.stop_loss,
            exit_price: None,
            profit_loss: None,
            status: TradeStatus::Open,
            opened_at,
            closed_at: None,
        };
        self.next_id += 1;
        self.trades.push(trade.clone());

        info!(
            id = trade.id,
            pair = %trade.currency_pair,
            side = %trade.trade_type,
            quantity = trade.quantity,
            entry = trade.entry_price,
            "opened paper trade"
        );
        Ok(trade)
    }

    /// Close an open trade at `exit_price` and book its P&L.
    pub fn close_trade(&mut self, id: u64, exit_price: f64) -> Result<PaperTrade, FxlabError> {
        self.close_trade_at(id, exit_price, Utc::now())
    }

    pub fn close_trade_at(
        &mut self,
        id: u64,
        exit_price: f64,
        closed_at: DateTime<Utc>,
    ) -> Result<PaperTrade, FxlabError> {
        require_positive("exit_price", exit_price)?;

        let trade = self
            .trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(FxlabError::TradeNotFound { id })?;

        if trade.status.is_terminal() {
            return Err(FxlabError::InvalidState {
                id,
                status: trade.status,
            });
        }

        let pnl = lot_pnl(trade.trade_type, trade.quantity, trade.entry_price, exit_price);
        trade.exit_price = Some(exit_price);
        trade.profit_loss = Some(pnl);
        trade.status = TradeStatus::Closed;
        trade.closed_at = Some(closed_at);
        let closed = trade.clone();

        self.balance += pnl;
        self.total_profit += pnl;
        self.total_trades += 1;
        if pnl > 0.0 {
            self.winning_trades += 1;
        }

        info!(id, exit = exit_price, pnl, balance = self.balance, "closed paper trade");
        Ok(closed)
    }

    /// Close at the table's mark price for the pair, or at entry when no
    /// quote is known.
    pub fn close_at_market(&mut self, id: u64, prices: &PriceTable) -> Result<PaperTrade, FxlabError> {
        let trade = self.trade(id).ok_or(FxlabError::TradeNotFound { id })?;
        let exit_price = prices
            .mark_price(&trade.currency_pair)
            .unwrap_or(trade.entry_price);
        self.close_trade(id, exit_price)
    }

    /// Floating P&L of an open trade against `mark_price`.
    pub fn unrealized_pnl(&self, id: u64, mark_price: f64) -> Result<f64, FxlabError> {
        let trade = self.trade(id).ok_or(FxlabError::TradeNotFound { id })?;
        if !trade.is_open() {
            return Err(FxlabError::InvalidState {
                id,
                status: trade.status,
            });
        }
        Ok(trade.unrealized_pnl(mark_price))
    }

    /// Floating P&L across every open trade, marking each at the table price
    /// (or its entry when the pair has no quote).
    pub fn total_unrealized_pnl(&self, prices: &PriceTable) -> f64 {
        self.open_trades()
            .map(|t| {
                let mark = prices.mark_price(&t.currency_pair).unwrap_or(t.entry_price);
                t.unrealized_pnl(mark)
            })
            .sum()
    }

    /// Restore the starting balance, zero the counters and cancel open trades.
    /// Returns the number of trades cancelled.
    pub fn reset(&mut self) -> usize {
        self.balance = self.initial_balance;
        self.total_profit = 0.0;
        self.total_trades = 0;
        self.winning_trades = 0;

        let mut cancelled = 0;
        for trade in self.trades.iter_mut().filter(|t| t.is_open()) {
            trade.status = TradeStatus::Cancelled;
            cancelled += 1;
        }

        debug!(cancelled, balance = self.balance, "portfolio reset");
        cancelled
    }

    /// Figures since the last reset; counters drive the win rate.
    pub fn summary(&self) -> PortfolioSummary {
        let win_rate = if self.total_trades == 0 {
            0.0
        } else {
            self.winning_trades as f64 / self.total_trades as f64 * 100.0
        };

        PortfolioSummary {
            balance: self.balance,
            total_profit: self.total_profit,
            pnl_pct: self.total_profit / self.initial_balance * 100.0,
            open_trades: self.open_trades().count(),
            closed_trades: self.total_trades,
            winning_trades: self.winning_trades,
            win_rate,
        }
    }
}

impl Default for Portfolio {
    fn default() -> Self {
        Portfolio {
            initial_balance: DEFAULT_INITIAL_BALANCE,
            balance: DEFAULT_INITIAL_BALANCE,
            total_profit: 0.0,
            total_trades: 0,
            winning_trades: 0,
            trades: Vec::new(),
            next_id: 1,
        }
    }
}
