use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Required column '{0}' is not present in the input frame")]
    MissingColumn(String),

    #[error("Column '{column}' has {actual} rows but the index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Column '{column}' has no valid observation at {timestamp}")]
    MissingValue { column: String, timestamp: String },

    #[error("Column '{0}' contains no valid observations")]
    EmptySeries(String),

    #[error("Unknown rebalance policy '{0}'")]
    UnknownStrategy(String),
}
