//! Configuration validation.
//!
//! Validates INI sections before anything is built from them.

use crate::domain::error::FxlabError;
use crate::domain::instrument::{CURRENCY_PAIRS, parse_pair};
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    validate_strategy(config)?;
    validate_currency_pair(config)?;
    validate_dates(config)?;
    validate_positive(config, "backtest", "initial_balance")?;
    validate_positive(config, "backtest", "take_profit")?;
    validate_positive(config, "backtest", "stop_loss")?;
    validate_risk_per_trade(config)?;
    validate_seed(config)?;
    validate_price_overrides(config)?;
    Ok(())
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    validate_positive(config, "portfolio", "initial_balance")?;
    validate_price_overrides(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FxlabError {
    FxlabError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    match config.get_string("backtest", "strategy") {
        None => Ok(()),
        Some(raw) => raw
            .parse::<Strategy>()
            .map(|_| ())
            .map_err(|e| invalid("backtest", "strategy", e.to_string())),
    }
}

fn validate_currency_pair(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    match config.get_string("backtest", "currency_pair") {
        None => Ok(()),
        Some(raw) => parse_pair(&raw)
            .map(|_| ())
            .map_err(|e| invalid("backtest", "currency_pair", e.to_string())),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    let start_date = config.get_date("backtest", "start_date")?;
    let end_date = config.get_date("backtest", "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

/// Absent is fine (a default applies); present must be a positive number.
fn validate_positive(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), FxlabError> {
    match config.get_optional_double(section, key)? {
        Some(value) if !(value.is_finite() && value > 0.0) => {
            Err(invalid(section, key, format!("{key} must be positive")))
        }
        _ => Ok(()),
    }
}

fn validate_risk_per_trade(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    match config.get_optional_double("backtest", "risk_per_trade")? {
        Some(value) if !(value > 0.0 && value <= 100.0) => Err(invalid(
            "backtest",
            "risk_per_trade",
            "risk_per_trade must be between 0 and 100",
        )),
        _ => Ok(()),
    }
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    match config.get_string("backtest", "seed") {
        Some(raw) if raw.trim().parse::<u64>().is_err() => Err(invalid(
            "backtest",
            "seed",
            "seed must be a non-negative integer",
        )),
        _ => Ok(()),
    }
}

fn validate_price_overrides(config: &dyn ConfigPort) -> Result<(), FxlabError> {
    for section in ["prices", "base_prices"] {
        for pair in CURRENCY_PAIRS {
            validate_positive(config, section, pair)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[backtest]
strategy = ma_crossover
currency_pair = EURUSD
start_date = 2025-01-01
end_date = 2026-01-31
initial_balance = 10000
risk_per_trade = 2
take_profit = 50
stop_loss = 25
seed = 42

[portfolio]
initial_balance = 10000

[prices]
EURUSD = 1.0852
"#;

    fn with_backtest_line(key: &str, value: &str) -> FileConfigAdapter {
        let content: String = VALID
            .lines()
            .map(|line| {
                if line.starts_with(&format!("{key} =")) {
                    format!("{key} = {value}")
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        FileConfigAdapter::from_string(&content).unwrap()
    }

    fn assert_invalid(config: &FileConfigAdapter, expected_key: &str) {
        match validate_backtest_config(config) {
            Err(FxlabError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = FileConfigAdapter::from_string(VALID).unwrap();
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_portfolio_config(&config).is_ok());
    }

    #[test]
    fn zero_stop_loss_rejected() {
        assert_invalid(&with_backtest_line("stop_loss", "0"), "stop_loss");
    }

    #[test]
    fn negative_take_profit_rejected() {
        assert_invalid(&with_backtest_line("take_profit", "-5"), "take_profit");
    }

    #[test]
    fn risk_bounds() {
        assert_invalid(&with_backtest_line("risk_per_trade", "0"), "risk_per_trade");
        assert_invalid(&with_backtest_line("risk_per_trade", "150"), "risk_per_trade");
        let ok = with_backtest_line("risk_per_trade", "100");
        assert!(validate_backtest_config(&ok).is_ok());
    }

    #[test]
    fn non_numeric_value_rejected() {
        assert_invalid(&with_backtest_line("stop_loss", "wide"), "stop_loss");
    }

    #[test]
    fn unknown_strategy_rejected() {
        assert_invalid(&with_backtest_line("strategy", "grid"), "strategy");
    }

    #[test]
    fn unknown_pair_rejected() {
        assert_invalid(&with_backtest_line("currency_pair", "AUDNZD"), "currency_pair");
    }

    #[test]
    fn bad_seed_rejected() {
        assert_invalid(&with_backtest_line("seed", "-1"), "seed");
    }

    #[test]
    fn reversed_dates_rejected() {
        assert_invalid(&with_backtest_line("start_date", "2027-01-01"), "start_date");
    }

    #[test]
    fn missing_dates_reported() {
        let config = FileConfigAdapter::from_string("[backtest]\nstop_loss = 25\n").unwrap();
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, FxlabError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_price_override_rejected() {
        let config = FileConfigAdapter::from_string("[prices]\nXAUUSD = -1\n").unwrap();
        let err = validate_portfolio_config(&config).unwrap_err();
        assert!(matches!(err, FxlabError::ConfigInvalid { section, .. } if section == "prices"));
    }

    #[test]
    fn portfolio_balance_must_be_positive() {
        let config = FileConfigAdapter::from_string("[portfolio]\ninitial_balance = 0\n").unwrap();
        assert!(validate_portfolio_config(&config).is_err());
    }

    #[test]
    fn empty_portfolio_config_is_valid() {
        assert!(validate_portfolio_config(&FileConfigAdapter::empty()).is_ok());
    }
}
