pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::StrategyType;
pub use error::CoreError;
pub use structs::{ColumnMap, InputFrame, MarketBar};

// Time zone of tz-aware input indexes.
pub use chrono_tz::Tz;
