//! Error types for bargain

use thiserror::Error;

/// Main error type for bargain
#[derive(Error, Debug)]
pub enum NegotiatorError {
    // Domain errors
    #[error("Domain has no issues")]
    EmptyDomain,

    #[error("Issue {0} has no values")]
    EmptyIssue(u32),

    #[error("Unknown issue: {0}")]
    UnknownIssue(u32),

    #[error("Unknown value {value} for issue {issue}")]
    UnknownValue { issue: u32, value: String },

    #[error("Outcome is incomplete: missing issue {0}")]
    IncompleteOutcome(u32),

    #[error("Utility profile error: {0}")]
    Profile(String),

    #[error("Outcome space is degenerate: {0}")]
    DegenerateSpace(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    // Host errors
    #[error("Party disconnected: {0}")]
    PartyDisconnected(String),

    #[error("Session needs at least two parties, got {0}")]
    NotEnoughParties(usize),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for bargain operations
pub type Result<T> = std::result::Result<T, NegotiatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = NegotiatorError::PartyDisconnected("party_3".to_string());
        assert_eq!(err.to_string(), "Party disconnected: party_3");
    }

    #[test]
    fn test_unknown_value_error() {
        let err = NegotiatorError::UnknownValue {
            issue: 2,
            value: "red".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown value red for issue 2");
    }

    #[test]
    fn test_error_conversion() {
        fn io_error_function() -> Result<()> {
            std::fs::read_to_string("/nonexistent/profile.json")?;
            Ok(())
        }

        let result = io_error_function();
        assert!(matches!(result.unwrap_err(), NegotiatorError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        fn parse() -> Result<u32> {
            Ok(serde_json::from_str::<u32>("not json")?)
        }

        assert!(matches!(parse().unwrap_err(), NegotiatorError::Json(_)));
    }
}
