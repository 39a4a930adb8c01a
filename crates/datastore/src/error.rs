use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read or write the table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("The loaded table does not form a valid input frame: {0}")]
    Frame(#[from] core_types::CoreError),

    #[error("Timestamp column '{0}' is not present in the table")]
    MissingTimestamp(String),

    #[error(
        "Timestamp column '{column}' has unsupported type {dtype}; expected a datetime or epoch milliseconds"
    )]
    TimestampType { column: String, dtype: String },

    #[error("Timestamp column '{column}' has a null or out-of-range value at row {row}")]
    InvalidTimestamp { column: String, row: usize },

    #[error("Timestamp column '{column}' uses time zone '{zone}', which is not a known IANA zone")]
    UnknownTimeZone { column: String, zone: String },

    #[error("Timestamps must be strictly increasing; row {row} ({timestamp}) breaks the order")]
    Unsorted { row: usize, timestamp: String },
}
