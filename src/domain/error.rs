//! Domain error types.

/// Top-level error type for rotator.
#[derive(Debug, thiserror::Error)]
pub enum RotatorError {
    #[error("insufficient history for {what}: have {have}, need {need}")]
    InsufficientHistory {
        what: String,
        have: usize,
        need: usize,
    },

    #[error("data integrity error: {reason}")]
    DataIntegrity { reason: String },

    #[error("invalid screen weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RotatorError {
    pub fn integrity(reason: impl Into<String>) -> Self {
        RotatorError::DataIntegrity {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RotatorError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&RotatorError> for std::process::ExitCode {
    fn from(err: &RotatorError) -> Self {
        let code: u8 = match err {
            RotatorError::Io(_) => 1,
            RotatorError::ConfigParse { .. }
            | RotatorError::ConfigMissing { .. }
            | RotatorError::ConfigInvalid { .. } => 2,
            RotatorError::Database { .. } | RotatorError::DatabaseQuery { .. } => 3,
            RotatorError::InvalidWeights { .. } => 4,
            RotatorError::NoData { .. }
            | RotatorError::InsufficientHistory { .. }
            | RotatorError::DataIntegrity { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_history_message() {
        let err = RotatorError::InsufficientHistory {
            what: "day_20 periods".into(),
            have: 5,
            need: 21,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for day_20 periods: have 5, need 21"
        );
    }

    #[test]
    fn integrity_helper() {
        let err = RotatorError::integrity("zero price for SPY on 2024-01-02");
        assert!(matches!(err, RotatorError::DataIntegrity { .. }));
        assert!(err.to_string().contains("SPY"));
    }

    #[test]
    fn invalid_config_helper() {
        let err = RotatorError::invalid_config("backtest", "cadence", "unknown cadence");
        match err {
            RotatorError::ConfigInvalid {
                section,
                key,
                reason,
            } => {
                assert_eq!(section, "backtest");
                assert_eq!(key, "cadence");
                assert_eq!(reason, "unknown cadence");
            }
            other => panic!("expected ConfigInvalid, got: {other}"),
        }
    }
}
