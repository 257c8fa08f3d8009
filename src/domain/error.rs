//! Domain error types.

use super::trade::TradeStatus;

/// Top-level error type for fxlab.
#[derive(Debug, thiserror::Error)]
pub enum FxlabError {
    #[error("invalid {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("trade {id} is {status}, only open trades can be closed")]
    InvalidState { id: u64, status: TradeStatus },

    #[error("no trade with id {id}")]
    TradeNotFound { id: u64 },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("portfolio store error: {reason}")]
    Store { reason: String },

    #[error("portfolio lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FxlabError {
    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        FxlabError::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&FxlabError> for std::process::ExitCode {
    fn from(err: &FxlabError) -> Self {
        let code: u8 = match err {
            FxlabError::Io(_) | FxlabError::Store { .. } | FxlabError::LockPoisoned => 1,
            FxlabError::InvalidConfig { .. }
            | FxlabError::ConfigParse { .. }
            | FxlabError::ConfigMissing { .. }
            | FxlabError::ConfigInvalid { .. } => 2,
            FxlabError::InvalidState { .. } => 3,
            FxlabError::TradeNotFound { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_message_names_status() {
        let err = FxlabError::InvalidState {
            id: 7,
            status: TradeStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "trade 7 is cancelled, only open trades can be closed"
        );
    }

    #[test]
    fn invalid_config_helper() {
        let err = FxlabError::invalid_config("stop_loss", "must be positive");
        assert!(matches!(err, FxlabError::InvalidConfig { ref field, .. } if field == "stop_loss"));
        assert_eq!(err.to_string(), "invalid stop_loss: must be positive");
    }

    #[test]
    fn exit_codes_by_kind() {
        let cases = [
            (FxlabError::invalid_config("quantity", "x"), "2"),
            (FxlabError::TradeNotFound { id: 1 }, "4"),
            (
                FxlabError::InvalidState {
                    id: 1,
                    status: TradeStatus::Closed,
                },
                "3",
            ),
            (FxlabError::Store { reason: "x".into() }, "1"),
        ];
        for (err, expected) in cases {
            let code = std::process::ExitCode::from(&err);
            assert!(format!("{code:?}").contains(expected), "{err}: {code:?}");
        }
    }
}
