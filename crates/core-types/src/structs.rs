use crate::error::CoreError;
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names of the input columns a backtest reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    /// Price of the primary (looped) asset.
    pub lst_price: String,
    /// Simple return of the primary asset.
    pub lst_return: String,
    /// Price of the hedge instrument.
    pub hedge_price: String,
    /// Simple return of the hedge instrument.
    pub hedge_return: String,
    /// The funding convention to use, one of possibly several funding columns.
    pub funding: String,
    /// Cross-asset price used for collateral unit conversion.
    #[serde(default)]
    pub cross_price: Option<String>,
}

impl ColumnMap {
    /// Every column the map refers to, in a stable order.
    pub fn required(&self) -> Vec<&str> {
        let mut names = vec![
            self.lst_price.as_str(),
            self.lst_return.as_str(),
            self.hedge_price.as_str(),
            self.hedge_return.as_str(),
            self.funding.as_str(),
        ];
        if let Some(cross) = &self.cross_price {
            names.push(cross.as_str());
        }
        names
    }
}

/// A time-indexed, column-oriented table of aligned market series.
///
/// Missing observations are `None`; a stored `NaN` is treated the same way.
/// The frame is read-only to the engine, which copies out the rows it needs.
///
/// The index is stored as UTC instants. `timezone` is the zone the source table
/// was recorded in; wall-clock logic such as the rebalance cadence reads hours there.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFrame {
    index: Vec<DateTime<Utc>>,
    timezone: Tz,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl InputFrame {
    pub fn new(index: Vec<DateTime<Utc>>) -> Self {
        Self {
            index,
            timezone: Tz::UTC,
            columns: BTreeMap::new(),
        }
    }

    /// Sets the zone the index is read in for wall-clock hours.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Builder-style variant of [`InputFrame::insert_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<Self, CoreError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Adds or replaces a column. Its length must match the index.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), CoreError> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(CoreError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Result<&[Option<f64>], CoreError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CoreError::MissingColumn(name.to_string()))
    }

    /// Position of the first non-missing observation in `name`.
    pub fn first_valid_index(&self, name: &str) -> Result<Option<usize>, CoreError> {
        Ok(self.column(name)?.iter().position(|v| valid(*v).is_some()))
    }

    /// Aligns the mapped columns into bars, trimmed to the first valid primary price.
    ///
    /// After trimming every mapped column must be populated on every row.
    pub fn bars(&self, columns: &ColumnMap) -> Result<Vec<MarketBar>, CoreError> {
        for name in columns.required() {
            self.column(name)?;
        }

        let start = self
            .first_valid_index(&columns.lst_price)?
            .ok_or_else(|| CoreError::EmptySeries(columns.lst_price.clone()))?;

        let lst_price = self.column(&columns.lst_price)?;
        let lst_return = self.column(&columns.lst_return)?;
        let hedge_price = self.column(&columns.hedge_price)?;
        let hedge_return = self.column(&columns.hedge_return)?;
        let funding = self.column(&columns.funding)?;
        let cross = match &columns.cross_price {
            Some(name) => Some((name.as_str(), self.column(name)?)),
            None => None,
        };

        let mut bars = Vec::with_capacity(self.len() - start);
        for i in start..self.len() {
            let timestamp = self.index[i];
            let at = |name: &str, series: &[Option<f64>]| {
                valid(series[i]).ok_or_else(|| CoreError::MissingValue {
                    column: name.to_string(),
                    timestamp: timestamp.to_rfc3339(),
                })
            };

            let cross_price = match cross {
                Some((name, series)) => Some(at(name, series)?),
                None => None,
            };

            bars.push(MarketBar {
                timestamp,
                local_time: timestamp.with_timezone(&self.timezone).fixed_offset(),
                lst_price: at(&columns.lst_price, lst_price)?,
                lst_return: at(&columns.lst_return, lst_return)?,
                hedge_price: at(&columns.hedge_price, hedge_price)?,
                hedge_return: at(&columns.hedge_return, hedge_return)?,
                funding_rate: at(&columns.funding, funding)?,
                cross_price,
            });
        }

        tracing::debug!(
            skipped = start,
            rows = bars.len(),
            timezone = %self.timezone,
            "Aligned input frame into market bars"
        );
        Ok(bars)
    }
}

/// One aligned input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketBar {
    pub timestamp: DateTime<Utc>,
    /// The same instant in the frame's time zone.
    pub local_time: DateTime<FixedOffset>,
    pub lst_price: f64,
    pub lst_return: f64,
    pub hedge_price: f64,
    pub hedge_return: f64,
    pub funding_rate: f64,
    pub cross_price: Option<f64>,
}

fn valid(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}
