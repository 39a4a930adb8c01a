use crate::error::StrategyError;
use chrono::{DateTime, TimeZone, Timelike};

/// A fixed wall-clock rebalance grid: every `every_hours` hours, anchored at `start_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceCadence {
    every_hours: u32,
    start_hour: u32,
}

impl RebalanceCadence {
    pub fn new(every_hours: u32, start_hour: u32) -> Result<Self, StrategyError> {
        if every_hours == 0 {
            return Err(StrategyError::InvalidCadence(
                "rebalance_hours must be at least 1".to_string(),
            ));
        }
        if start_hour >= 24 {
            return Err(StrategyError::InvalidCadence(format!(
                "start_hour must be within 0..24, got {}",
                start_hour
            )));
        }
        Ok(Self {
            every_hours,
            start_hour,
        })
    }

    pub fn every_hours(&self) -> u32 {
        self.every_hours
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    /// True when the timestamp's wall-clock hour, read in its own zone, lies on the grid
    /// `start_hour + k * every_hours`.
    pub fn is_due<Z: TimeZone>(&self, timestamp: &DateTime<Z>) -> bool {
        let offset = i64::from(timestamp.hour()) - i64::from(self.start_hour);
        offset.rem_euclid(i64::from(self.every_hours)) == 0
    }
}
