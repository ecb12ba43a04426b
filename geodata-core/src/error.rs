//! Error types for domain parsing.

use thiserror::Error;

/// Errors raised while parsing housing domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HousingParseError {
    #[error("Unknown metric parameter: {0}")]
    UnknownMetric(String),

    #[error("Unknown housing type parameter: {0}")]
    UnknownHousingType(String),

    #[error("Invalid period label: {0}")]
    InvalidPeriod(String),

    #[error("Quarter out of range (1-4): {0}")]
    QuarterOutOfRange(i32),
}
