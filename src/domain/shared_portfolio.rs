//! Thread-safe handle over a [`Portfolio`].
//!
//! Each call holds the lock for the whole read-modify-write, so a trade's P&L
//! is applied at most once no matter how many callers race to close it.

use std::sync::{Arc, Mutex, MutexGuard};

use super::error::FxlabError;
use super::instrument::PriceTable;
use super::portfolio::{OpenTrade, Portfolio, PortfolioSummary};
use super::trade::PaperTrade;

#[derive(Debug, Clone)]
pub struct SharedPortfolio {
    inner: Arc<Mutex<Portfolio>>,
}

impl SharedPortfolio {
    pub fn new(portfolio: Portfolio) -> Self {
        SharedPortfolio {
            inner: Arc::new(Mutex::new(portfolio)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Portfolio>, FxlabError> {
        self.inner.lock().map_err(|_| FxlabError::LockPoisoned)
    }

    pub fn open_trade(&self, request: OpenTrade) -> Result<PaperTrade, FxlabError> {
        self.lock()?.open_trade(request)
    }

    pub fn close_trade(&self, id: u64, exit_price: f64) -> Result<PaperTrade, FxlabError> {
        self.lock()?.close_trade(id, exit_price)
    }

    pub fn close_at_market(&self, id: u64, prices: &PriceTable) -> Result<PaperTrade, FxlabError> {
        self.lock()?.close_at_market(id, prices)
    }

    pub fn reset(&self) -> Result<usize, FxlabError> {
        Ok(self.lock()?.reset())
    }

    pub fn summary(&self) -> Result<PortfolioSummary, FxlabError> {
        Ok(self.lock()?.summary())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Result<Portfolio, FxlabError> {
        Ok(self.lock()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::TradeType;
    use std::thread;

    #[test]
    fn racing_closes_apply_pnl_once() {
        let shared = SharedPortfolio::new(Portfolio::default());
        let trade = shared
            .open_trade(OpenTrade::new("EURUSD", TradeType::Buy, 0.1, 1.0850))
            .unwrap();

        let outcomes: Vec<Result<PaperTrade, FxlabError>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let shared = shared.clone();
                    s.spawn(move || shared.close_trade(trade.id, 1.0950))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let successes = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, FxlabError::InvalidState { .. })));

        let snapshot = shared.snapshot().unwrap();
        assert_eq!(snapshot.total_trades, 1);
        assert!((snapshot.balance - 10_100.0).abs() < 1e-6);
    }

    #[test]
    fn parallel_opens_get_distinct_ids() {
        let shared = SharedPortfolio::new(Portfolio::default());
        thread::scope(|s| {
            for _ in 0..4 {
                let shared = shared.clone();
                s.spawn(move || {
                    shared
                        .open_trade(OpenTrade::new("XAUUSD", TradeType::Sell, 0.01, 2045.5))
                        .unwrap();
                });
            }
        });
        let snapshot = shared.snapshot().unwrap();
        let mut ids: Vec<u64> = snapshot.trades().iter().map(|t| t.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn reset_through_handle() {
        let shared = SharedPortfolio::new(Portfolio::default());
        shared
            .open_trade(OpenTrade::new("EURUSD", TradeType::Buy, 0.1, 1.0850))
            .unwrap();
        assert_eq!(shared.reset().unwrap(), 1);
        assert_eq!(shared.summary().unwrap().open_trades, 0);
    }
}
