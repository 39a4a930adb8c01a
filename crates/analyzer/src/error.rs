use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("The sweep produced no completed runs")]
    NoRunsFound,

    #[error("Invalid analysis setting: {0}")]
    InvalidSettings(String),
}
