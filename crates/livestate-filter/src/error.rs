use crate::operator::Operator;
use thiserror::Error;

/// Errors raised while building a filter tree.
///
/// Evaluation never fails: everything that can go wrong is caught here,
/// before the first row is looked at.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("AND filter needs at least one child")]
    EmptyConjunction,
    #[error("OR filter needs at least one child")]
    EmptyDisjunction,
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Operator {operator} is not supported on column {column}")]
    UnsupportedOperator { column: String, operator: Operator },
    #[error("Invalid operand {operand:?} for column {column}")]
    InvalidOperand { column: String, operand: String },
    #[error("Invalid regular expression {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FilterError>;
