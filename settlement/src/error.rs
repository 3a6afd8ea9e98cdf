//! Error types for the settlement minimizer

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Amount is zero, negative or not finite
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transaction debtor and creditor are the same participant
    #[error("Invalid participant pair: {0} cannot owe itself")]
    InvalidParticipantPair(String),

    /// Empty participant identifier
    #[error("Invalid participant: {0}")]
    InvalidParticipant(String),

    /// Invariant violation (money conservation, settlement count, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Arithmetic left the decimal range
    #[error("Amount overflow: {0}")]
    Overflow(String),

    /// Input larger than the configured limits
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by malformed transactions
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidAmount(_)
                | Error::InvalidParticipantPair(_)
                | Error::InvalidParticipant(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(Error::InvalidAmount("-1".into()).is_validation());
        assert!(Error::InvalidParticipantPair("A".into()).is_validation());
        assert!(!Error::LimitExceeded("too many".into()).is_validation());
        assert!(!Error::Overflow("position of A".into()).is_validation());
    }

    #[test]
    fn test_pair_message() {
        let err = Error::InvalidParticipantPair("alice".into());
        assert_eq!(
            err.to_string(),
            "Invalid participant pair: alice cannot owe itself"
        );
    }
}
