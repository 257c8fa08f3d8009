#![allow(dead_code)]

use chrono::NaiveDate;
use fxlab::domain::backtest::BacktestConfig;
use fxlab::domain::error::FxlabError;
use fxlab::domain::portfolio::Portfolio;
use fxlab::domain::strategy::Strategy;
use fxlab::ports::portfolio_store::PortfolioStore;
use std::cell::{Cell, RefCell};
use std::io::Write;

pub const VALID_INI: &str = r#"
[backtest]
strategy = rsi_oversold
currency_pair = GBPUSD
start_date = 2025-01-01
end_date = 2025-06-30
initial_balance = 10000
risk_per_trade = 2
take_profit = 50
stop_loss = 25
seed = 7

[portfolio]
initial_balance = 5000

[prices]
EURUSD = 1.0900
"#;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn make_config(initial_balance: f64, risk: f64, take_profit: f64, stop_loss: f64) -> BacktestConfig {
    BacktestConfig {
        strategy: Strategy::MaCrossover,
        currency_pair: "EURUSD".to_string(),
        start_date: date(2025, 1, 1),
        end_date: date(2026, 1, 31),
        initial_balance,
        risk_per_trade: risk,
        take_profit,
        stop_loss,
    }
}

/// In-memory store that counts saves.
pub struct MemoryStore {
    pub portfolio: RefCell<Option<Portfolio>>,
    pub saves: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            portfolio: RefCell::new(None),
            saves: Cell::new(0),
        }
    }

    pub fn with_portfolio(portfolio: Portfolio) -> Self {
        let store = Self::new();
        *store.portfolio.borrow_mut() = Some(portfolio);
        store
    }

    pub fn current(&self) -> Option<Portfolio> {
        self.portfolio.borrow().clone()
    }
}

impl PortfolioStore for MemoryStore {
    fn load(&self) -> Result<Option<Portfolio>, FxlabError> {
        Ok(self.portfolio.borrow().clone())
    }

    fn save(&self, portfolio: &Portfolio) -> Result<(), FxlabError> {
        *self.portfolio.borrow_mut() = Some(portfolio.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
