//! Backtest simulator.
//!
//! Generates a synthetic trade sequence for a strategy/pair/date range and
//! aggregates it into a [`BacktestResult`]. Outcomes come from a
//! [`RandomSource`], prices from a [`PriceTable`]; no market data is read.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::FxlabError;
use super::instrument::{PriceTable, is_supported_pair};
use super::metrics::{self, BacktestStats};
use super::random::RandomSource;
use super::strategy::Strategy;
use super::trade::{SimulatedTrade, TradeType};

/// Fewest trades a run generates.
pub const MIN_TRADES: u32 = 20;
/// Number of distinct trade counts above the minimum (20..=49).
pub const TRADE_COUNT_SPAN: u32 = 30;
/// A draw above this threshold wins, giving a 55% win probability.
pub const LOSS_THRESHOLD: f64 = 0.45;
/// Days between consecutive simulated trades.
pub const DAYS_BETWEEN_TRADES: u64 = 3;
/// Entry prices land within +/-1% of the instrument's base price.
pub const ENTRY_JITTER: f64 = 0.02;
pub const WIN_EXIT_MOVE: f64 = 0.01;
pub const LOSS_EXIT_MOVE: f64 = -0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy: Strategy,
    pub currency_pair: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_balance: f64,
    /// Percent of the running balance risked on each trade.
    pub risk_per_trade: f64,
    /// Take-profit distance in pips/points.
    pub take_profit: f64,
    /// Stop-loss distance in pips/points.
    pub stop_loss: f64,
}

impl BacktestConfig {
    /// Reject configurations the simulator cannot run.
    pub fn validate(&self) -> Result<(), FxlabError> {
        require_finite("initial_balance", self.initial_balance)?;
        require_finite("risk_per_trade", self.risk_per_trade)?;
        require_finite("take_profit", self.take_profit)?;
        require_finite("stop_loss", self.stop_loss)?;

        if self.initial_balance <= 0.0 {
            return Err(FxlabError::invalid_config(
                "initial_balance",
                "initial_balance must be positive",
            ));
        }
        if self.stop_loss <= 0.0 {
            return Err(FxlabError::invalid_config(
                "stop_loss",
                "stop_loss must be positive",
            ));
        }
        if self.take_profit <= 0.0 {
            return Err(FxlabError::invalid_config(
                "take_profit",
                "take_profit must be positive",
            ));
        }
        if self.risk_per_trade <= 0.0 || self.risk_per_trade > 100.0 {
            return Err(FxlabError::invalid_config(
                "risk_per_trade",
                "risk_per_trade must be in (0, 100]",
            ));
        }
        if self.start_date > self.end_date {
            return Err(FxlabError::invalid_config(
                "start_date",
                "start_date must not be after end_date",
            ));
        }
        if !is_supported_pair(&self.currency_pair) {
            return Err(FxlabError::invalid_config(
                "currency_pair",
                format!("unsupported pair '{}'", self.currency_pair),
            ));
        }
        Ok(())
    }

    /// Reward multiple applied to the risked amount on a winning trade.
    pub fn reward_ratio(&self) -> f64 {
        self.take_profit / self.stop_loss
    }
}

fn require_finite(field: &str, value: f64) -> Result<(), FxlabError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FxlabError::invalid_config(field, "must be a finite number"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy: Strategy,
    pub strategy_name: String,
    pub currency_pair: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_balance: f64,
    pub final_balance: f64,
    #[serde(flatten)]
    pub stats: BacktestStats,
    pub trades: Vec<SimulatedTrade>,
}

impl BacktestResult {
    /// Percent change from initial to final balance.
    pub fn return_pct(&self) -> f64 {
        (self.final_balance - self.initial_balance) / self.initial_balance * 100.0
    }

    pub fn is_profitable(&self) -> bool {
        self.final_balance > self.initial_balance
    }

    /// Running balance after each trade.
    pub fn equity_curve(&self) -> Vec<f64> {
        metrics::equity_curve(self.initial_balance, &self.trades)
    }
}

/// Run one simulated backtest.
///
/// Draw order per trade is outcome, entry jitter, then side, so a seeded
/// source reproduces a run exactly.
pub fn run_backtest<R: RandomSource + ?Sized>(
    config: &BacktestConfig,
    prices: &PriceTable,
    rng: &mut R,
) -> Result<BacktestResult, FxlabError> {
    config.validate()?;

    let count = MIN_TRADES + (rng.next_unit() * TRADE_COUNT_SPAN as f64).floor() as u32;
    let base_price = prices.base_price(&config.currency_pair);
    let risk_fraction = config.risk_per_trade / 100.0;
    let reward_ratio = config.reward_ratio();

    debug!(
        strategy = %config.strategy,
        pair = %config.currency_pair,
        count,
        base_price,
        "simulating trades"
    );

    let mut balance = config.initial_balance;
    let mut trades = Vec::with_capacity(count as usize);

    for i in 0..count {
        let is_win = rng.next_unit() > LOSS_THRESHOLD;
        let risked = balance * risk_fraction;
        let profit = if is_win { risked * reward_ratio } else { -risked };

        let entry_price = base_price * (1.0 + (rng.next_unit() - 0.5) * ENTRY_JITTER);
        let exit_move = if is_win { WIN_EXIT_MOVE } else { LOSS_EXIT_MOVE };
        let exit_price = entry_price * (1.0 + exit_move);

        let trade_type = if rng.next_unit() > 0.5 {
            TradeType::Buy
        } else {
            TradeType::Sell
        };

        trades.push(SimulatedTrade {
            date: trade_date(config.start_date, i)?,
            trade_type,
            entry_price,
            exit_price,
            profit,
        });

        balance += profit;
    }

    let stats = BacktestStats::compute(config.initial_balance, &trades);

    Ok(BacktestResult {
        strategy: config.strategy,
        strategy_name: config.strategy.display_name().to_string(),
        currency_pair: config.currency_pair.clone(),
        start_date: config.start_date,
        end_date: config.end_date,
        initial_balance: config.initial_balance,
        final_balance: balance,
        stats,
        trades,
    })
}

fn trade_date(start: NaiveDate, index: u32) -> Result<NaiveDate, FxlabError> {
    start
        .checked_add_days(Days::new(index as u64 * DAYS_BETWEEN_TRADES))
        .ok_or_else(|| FxlabError::invalid_config("start_date", "trade dates overflow the calendar"))
}
