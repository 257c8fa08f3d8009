//! Strategies the backtest simulator can be asked to run.
//!
//! The simulator does not evaluate any rules; the strategy only labels the run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::FxlabError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    MaCrossover,
    RsiOversold,
    Breakout,
    MeanReversion,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::MaCrossover,
        Strategy::RsiOversold,
        Strategy::Breakout,
        Strategy::MeanReversion,
    ];

    /// Key used in config files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Strategy::MaCrossover => "ma_crossover",
            Strategy::RsiOversold => "rsi_oversold",
            Strategy::Breakout => "breakout",
            Strategy::MeanReversion => "mean_reversion",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Strategy::MaCrossover => "Moving Average Crossover",
            Strategy::RsiOversold => "RSI Oversold",
            Strategy::Breakout => "Level Breakout",
            Strategy::MeanReversion => "Mean Reversion",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Strategy {
    type Err = FxlabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.key() == wanted)
            .ok_or_else(|| {
                let keys: Vec<&str> = Strategy::ALL.iter().map(|s| s.key()).collect();
                FxlabError::invalid_config(
                    "strategy",
                    format!("unknown strategy '{}', expected one of {}", s.trim(), keys.join(", ")),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_str() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.key().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn from_str_accepts_dashes_and_case() {
        assert_eq!(
            "Mean-Reversion".parse::<Strategy>().unwrap(),
            Strategy::MeanReversion
        );
    }

    #[test]
    fn unknown_strategy_is_invalid_config() {
        let err = "martingale".parse::<Strategy>().unwrap_err();
        assert!(err.to_string().contains("ma_crossover"));
    }

    #[test]
    fn display_names() {
        assert_eq!(Strategy::MaCrossover.display_name(), "Moving Average Crossover");
        assert_eq!(Strategy::Breakout.to_string(), "breakout");
    }
}
