//! Error types for subset risk estimation

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while building market data or estimating risk
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Duplicate observation for {symbol} on {date}")]
    DuplicateObservation { symbol: String, date: NaiveDate },

    #[error("Invalid price {price} for {symbol} on {date} (must be positive and finite)")]
    InvalidPrice {
        symbol: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("Empty universe: {0}")]
    EmptyUniverse(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Anchor {0} is not a member of the portfolio")]
    AnchorNotInPortfolio(String),

    #[error("Invalid portfolio size {requested}: universe holds {available} assets")]
    InvalidPortfolioSize { requested: usize, available: usize },

    #[error("Portfolio lists {0} more than once")]
    DuplicateMember(String),

    #[error("Invalid confidence level: {0} (must be between 0 and 1)")]
    InvalidConfidenceLevel(f64),

    #[error("Invalid simulation count: {0} (must be at least 1)")]
    InvalidSimulationCount(usize),

    #[error("No return observations between {start} and {end}")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Degenerate portfolio: {0}")]
    DegeneratePortfolio(String),

    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Date parse error: {0}")]
    DateParse(String),
}

impl From<serde_yaml::Error> for RiskError {
    fn from(err: serde_yaml::Error) -> Self {
        RiskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::Config(err.to_string())
    }
}

impl From<chrono::ParseError> for RiskError {
    fn from(err: chrono::ParseError) -> Self {
        RiskError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = RiskError::InvalidPrice {
            symbol: "AAPL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            price: 0.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("AAPL"));
        assert!(msg.contains("2024-01-02"));

        let err = RiskError::InvalidPortfolioSize {
            requested: 7,
            available: 4,
        };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let err: RiskError = serde_yaml::from_str::<u32>("[not, a, number]")
            .unwrap_err()
            .into();
        assert!(matches!(err, RiskError::Config(_)));
    }
}
