use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Invalid metric settings: {0}")]
    InvalidSettings(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
