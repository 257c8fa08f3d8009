//! Performance statistics for a simulated trade sequence.

use serde::{Deserialize, Serialize};

use super::trade::SimulatedTrade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Trades with `profit <= 0`; breakeven counts as a loss.
    pub losing_trades: usize,
    /// Percent of trades that won, 0-100.
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Largest peak-to-trough fall of the equity curve, in percent of the peak.
    pub max_drawdown: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl BacktestStats {
    pub fn compute(initial_balance: f64, trades: &[SimulatedTrade]) -> Self {
        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in trades {
            let profit = trade.profit;
            if profit > 0.0 {
                winning_trades += 1;
                gross_profit += profit;
                largest_win = largest_win.max(profit);
            } else {
                losing_trades += 1;
                gross_loss += profit.abs();
                largest_loss = largest_loss.max(profit.abs());
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        // With no losses the ratio is undefined; report gross profit instead.
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            gross_profit
        };

        let avg_win = if winning_trades > 0 {
            gross_profit / winning_trades as f64
        } else {
            0.0
        };

        let avg_loss = if losing_trades > 0 {
            gross_loss / losing_trades as f64
        } else {
            0.0
        };

        let curve = equity_curve(initial_balance, trades);
        let max_drawdown = compute_drawdown(initial_balance, &curve);

        BacktestStats {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            profit_factor,
            max_drawdown,
            gross_profit,
            gross_loss,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
        }
    }
}

/// Balance after each trade, in trade order.
pub fn equity_curve(initial_balance: f64, trades: &[SimulatedTrade]) -> Vec<f64> {
    trades
        .iter()
        .scan(initial_balance, |balance, trade| {
            *balance += trade.profit;
            Some(*balance)
        })
        .collect()
}

/// Maximum drawdown in percent. The running peak starts at `initial_balance`.
pub fn compute_drawdown(initial_balance: f64, curve: &[f64]) -> f64 {
    let mut peak = initial_balance;
    let mut max_dd = 0.0_f64;

    for &equity in curve {
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            let dd = (peak - equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::TradeType;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn make_trades(profits: &[f64]) -> Vec<SimulatedTrade> {
        profits
            .iter()
            .enumerate()
            .map(|(i, &profit)| SimulatedTrade {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                    + chrono::Duration::days(3 * i as i64),
                trade_type: TradeType::Buy,
                entry_price: 1.08,
                exit_price: 1.09,
                profit,
            })
            .collect()
    }

    #[test]
    fn stats_empty() {
        let stats = BacktestStats::compute(10_000.0, &[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.winning_trades, 0);
        assert_eq!(stats.losing_trades, 0);
        assert_abs_diff_eq!(stats.win_rate, 0.0);
        assert_abs_diff_eq!(stats.profit_factor, 0.0);
        assert_abs_diff_eq!(stats.max_drawdown, 0.0);
    }

    #[test]
    fn breakeven_counts_as_loss() {
        let stats = BacktestStats::compute(10_000.0, &make_trades(&[100.0, 0.0, -50.0]));
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 2);
        assert_eq!(stats.total_trades, 3);
    }

    #[test]
    fn win_rate_is_percent() {
        let stats = BacktestStats::compute(10_000.0, &make_trades(&[100.0, -50.0, 200.0, -10.0]));
        assert_abs_diff_eq!(stats.win_rate, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn profit_factor_ratio() {
        let stats = BacktestStats::compute(10_000.0, &make_trades(&[100.0, -50.0, 200.0]));
        assert_abs_diff_eq!(stats.profit_factor, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn profit_factor_without_losses_is_gross_profit() {
        let stats = BacktestStats::compute(10_000.0, &make_trades(&[100.0, 250.0]));
        assert_abs_diff_eq!(stats.profit_factor, 350.0, epsilon = 1e-12);
    }

    #[test]
    fn averages_and_extremes() {
        let stats =
            BacktestStats::compute(10_000.0, &make_trades(&[100.0, -60.0, 300.0, -140.0]));
        assert_abs_diff_eq!(stats.avg_win, 200.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.avg_loss, 100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.largest_win, 300.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.largest_loss, 140.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.gross_profit, 400.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.gross_loss, 200.0, epsilon = 1e-12);
    }

    #[test]
    fn equity_curve_accumulates() {
        let curve = equity_curve(1000.0, &make_trades(&[100.0, -50.0, 25.0]));
        assert_eq!(curve, vec![1100.0, 1050.0, 1075.0]);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let dd = compute_drawdown(100.0, &[110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_abs_diff_eq!(dd, (110.0 - 80.0) / 110.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_counts_first_trade_loss_against_initial() {
        let dd = compute_drawdown(10_000.0, &[9_800.0, 9_900.0]);
        assert_abs_diff_eq!(dd, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_monotonic_rise_is_zero() {
        assert_abs_diff_eq!(compute_drawdown(100.0, &[101.0, 102.0, 103.0]), 0.0);
    }
}
