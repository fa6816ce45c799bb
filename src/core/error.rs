use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Enter a valid monthly benefit at age {reference_age}.")]
    InvalidReferenceAmount { reference_age: u32, amount: f64 },

    #[error("multiplier table must cover ages {first}..={last} without gaps (found age {found} at position {position})")]
    MultiplierGap {
        first: u32,
        last: u32,
        found: u32,
        position: usize,
    },

    #[error("multiplier for age {age} must be finite and > 0")]
    InvalidMultiplier { age: u32 },

    #[error("benefit CSV must have headers: age,monthly")]
    MissingCsvHeaders,

    #[error("benefit CSV line {line}: {reason}")]
    InvalidCsvRow { line: usize, reason: String },

    #[error("benefit CSV contained no rows")]
    EmptyCsv,
}
