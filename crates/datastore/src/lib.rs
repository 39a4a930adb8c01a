//! # Hedgeloop Data Store
//!
//! The columnar boundary of the system. Input series arrive as Parquet or CSV
//! files and are converted into the engine's [`InputFrame`]; the emitted state
//! table goes back out the same way. Nothing past this crate sees a `DataFrame`.

use backtester::SimulationOutput;
use chrono::{DateTime, Utc};
use core_types::{InputFrame, Tz};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub mod error;

pub use error::StoreError;

/// Name of the timestamp column in written output tables.
pub const OUTPUT_TIMESTAMP: &str = "timestamp";

/// Reads an aligned input table. `.parquet` files are read as Parquet, anything else as CSV.
pub fn load_frame(path: &Path, timestamp_column: &str) -> Result<InputFrame, StoreError> {
    let df = if is_parquet(path) {
        ParquetReader::new(File::open(path)?).finish()?
    } else {
        CsvReader::from_path(path)?
            .has_header(true)
            .with_try_parse_dates(true)
            .finish()?
    };

    tracing::info!(path = %path.display(), shape = ?df.shape(), "Loaded input table");
    frame_from_dataframe(&df, timestamp_column)
}

/// Converts a `DataFrame` into an [`InputFrame`].
///
/// Every numeric column other than the timestamp is cast to `f64` with nulls
/// kept as `None`. Non-numeric columns are skipped.
pub fn frame_from_dataframe(
    df: &DataFrame,
    timestamp_column: &str,
) -> Result<InputFrame, StoreError> {
    let ts = df
        .column(timestamp_column)
        .map_err(|_| StoreError::MissingTimestamp(timestamp_column.to_string()))?;
    let index = timestamps(ts)?;
    let timezone = timezone(ts)?;

    if let Some(row) = (1..index.len()).find(|&i| index[i] <= index[i - 1]) {
        return Err(StoreError::Unsorted {
            row,
            timestamp: index[row].to_rfc3339(),
        });
    }

    let mut frame = InputFrame::new(index).with_timezone(timezone);
    for series in df.get_columns() {
        if series.name() == timestamp_column {
            continue;
        }
        if !series.dtype().is_numeric() {
            tracing::debug!(
                column = series.name(),
                dtype = %series.dtype(),
                "Skipping non-numeric column"
            );
            continue;
        }
        let values: Vec<Option<f64>> =
            series.cast(&DataType::Float64)?.f64()?.into_iter().collect();
        frame.insert_column(series.name(), values)?;
    }
    Ok(frame)
}

/// The zone a tz-aware datetime column was recorded in; naive columns and epoch
/// milliseconds are read as UTC.
fn timezone(series: &Series) -> Result<Tz, StoreError> {
    match series.dtype() {
        DataType::Datetime(_, Some(zone)) => {
            zone.parse().map_err(|_| StoreError::UnknownTimeZone {
                column: series.name().to_string(),
                zone: zone.to_string(),
            })
        }
        _ => Ok(Tz::UTC),
    }
}

fn timestamps(series: &Series) -> Result<Vec<DateTime<Utc>>, StoreError> {
    let to_utc: fn(i64) -> Option<DateTime<Utc>> = match series.dtype() {
        DataType::Datetime(TimeUnit::Nanoseconds, _) => |v| Some(DateTime::from_timestamp_nanos(v)),
        DataType::Datetime(TimeUnit::Microseconds, _) => DateTime::<Utc>::from_timestamp_micros,
        DataType::Datetime(TimeUnit::Milliseconds, _) | DataType::Int64 => {
            DateTime::<Utc>::from_timestamp_millis
        }
        other => {
            return Err(StoreError::TimestampType {
                column: series.name().to_string(),
                dtype: other.to_string(),
            });
        }
    };

    let physical = series.cast(&DataType::Int64)?;
    physical
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.and_then(to_utc).ok_or_else(|| StoreError::InvalidTimestamp {
                column: series.name().to_string(),
                row,
            })
        })
        .collect()
}

macro_rules! f64_columns {
    ($records:expr, $($field:ident),+ $(,)?) => {
        vec![$(
            Series::new(
                stringify!($field),
                $records.iter().map(|r| r.$field).collect::<Vec<f64>>(),
            )
        ),+]
    };
}

/// Lays the state table out as one column per record field, named after the field.
pub fn output_to_dataframe(output: &SimulationOutput) -> Result<DataFrame, StoreError> {
    let records = &output.records;
    let millis: Vec<i64> = records.iter().map(|r| r.timestamp.timestamp_millis()).collect();

    let mut columns = vec![
        Series::new(OUTPUT_TIMESTAMP, millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
    ];
    columns.extend(f64_columns!(
        records,
        lst_price,
        hedge_price,
        cross_factor,
        capital,
        count_loop,
        count_hedge,
        diff_lst,
        diff_hedge,
        loop_ret,
        lst_ret,
        hedge_ret,
        fund_ret,
        lst_cash,
        hedge_cash,
        lst_cash_end,
        hedge_cash_end,
        lst_pnl,
        hedge_pnl,
        hedge_pnl_mark,
        fund_pnl,
        free_pnl,
        total_pnl,
        lst_fees,
        hedge_fees,
        total_fees,
        cum_pnl,
        capital_dev,
        position_dev,
        leverage,
        strategy_ret,
        strategy_cumret,
    ));
    columns.push(Series::new(
        "rebalanced",
        records.iter().map(|r| r.rebalanced).collect::<Vec<bool>>(),
    ));

    Ok(DataFrame::new(columns)?)
}

/// Writes the state table as Parquet (`.parquet`) or CSV.
pub fn write_output(path: &Path, output: &SimulationOutput) -> Result<(), StoreError> {
    let mut df = output_to_dataframe(output)?;
    let mut file = File::create(path)?;
    if is_parquet(path) {
        ParquetWriter::new(&mut file).finish(&mut df)?;
    } else {
        CsvWriter::new(&mut file).finish(&mut df)?;
    }
    tracing::info!(path = %path.display(), rows = df.height(), "Wrote output table");
    Ok(())
}

fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use backtester::{BacktestParams, Backtester};
    use chrono::Timelike;
    use core_types::{ColumnMap, StrategyType};

    const HOUR_MS: i64 = 3_600_000;
    // 2024-01-01T00:00:00Z
    const START_MS: i64 = 1_704_067_200_000;

    fn hourly_millis(n: usize) -> Vec<i64> {
        (0..n as i64).map(|h| START_MS + h * HOUR_MS).collect()
    }

    fn sample_df() -> DataFrame {
        DataFrame::new(vec![
            Series::new("timestamp", hourly_millis(3)),
            Series::new("lst", &[Some(100.0), Some(101.0), Some(102.0)]),
            Series::new("lst_ret", &[Some(0.0), Some(0.01), Some(101.0 / 102.0 - 1.0)]),
            Series::new("hedge", &[50i64, 50, 51]),
            Series::new("hedge_ret", &[Some(0.0), Some(0.0), Some(0.02)]),
            Series::new("funding", &[0.0001, 0.0001, 0.0002]),
            Series::new("basis", &[None, Some(1.5), Some(1.25)]),
            Series::new("venue", &["a", "b", "c"]),
        ])
        .unwrap()
    }

    #[test]
    fn epoch_millis_index_and_numeric_columns_convert() {
        let frame = frame_from_dataframe(&sample_df(), "timestamp").unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(frame.index()[1].timestamp_millis(), START_MS + HOUR_MS);
        assert_eq!(frame.column("hedge").unwrap(), &[Some(50.0), Some(50.0), Some(51.0)]);
        assert_eq!(frame.column("basis").unwrap()[0], None);
        assert!(frame.column("venue").is_err());
        assert!(frame.column("timestamp").is_err());
    }

    #[test]
    fn datetime_index_of_any_unit_converts() {
        let mut df = sample_df();
        let micros = Series::new(
            "timestamp",
            hourly_millis(3).into_iter().map(|m| m * 1_000).collect::<Vec<i64>>(),
        )
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .unwrap();
        df.replace("timestamp", micros).unwrap();

        let frame = frame_from_dataframe(&df, "timestamp").unwrap();
        assert_eq!(frame.index()[2].timestamp_millis(), START_MS + 2 * HOUR_MS);
    }

    fn zoned_index(zone: &str) -> Series {
        Int64Chunked::from_vec("timestamp", hourly_millis(3))
            .into_datetime(TimeUnit::Milliseconds, Some(zone.to_string()))
            .into_series()
    }

    #[test]
    fn tz_aware_index_keeps_its_zone() {
        let mut df = sample_df();
        df.replace("timestamp", zoned_index("Asia/Tokyo")).unwrap();

        let frame = frame_from_dataframe(&df, "timestamp").unwrap();
        assert_eq!(frame.index()[0].timestamp_millis(), START_MS);
        assert_eq!(frame.timezone(), Tz::Asia__Tokyo);

        // 00:00Z lands on the 09:00 Tokyo grid.
        let bars = frame.bars(&sample_columns()).unwrap();
        assert_eq!(bars[0].local_time.hour(), 9);
        let cadence = strategies::RebalanceCadence::new(24, 9).unwrap();
        assert!(cadence.is_due(&bars[0].local_time));
        assert!(!cadence.is_due(&bars[0].timestamp));
    }

    #[test]
    fn naive_index_is_read_as_utc() {
        let frame = frame_from_dataframe(&sample_df(), "timestamp").unwrap();
        assert_eq!(frame.timezone(), Tz::UTC);
    }

    #[test]
    fn unknown_zone_name_is_rejected() {
        let mut df = sample_df();
        df.replace("timestamp", zoned_index("Mars/Olympus")).unwrap();
        assert!(matches!(
            frame_from_dataframe(&df, "timestamp"),
            Err(StoreError::UnknownTimeZone { zone, .. }) if zone == "Mars/Olympus"
        ));
    }

    #[test]
    fn unsorted_or_duplicate_timestamps_are_rejected() {
        let mut df = sample_df();
        df.replace("timestamp", Series::new("timestamp", &[START_MS, START_MS, START_MS + HOUR_MS]))
            .unwrap();
        assert!(matches!(
            frame_from_dataframe(&df, "timestamp"),
            Err(StoreError::Unsorted { row: 1, .. })
        ));
    }

    #[test]
    fn missing_or_textual_timestamp_column_is_rejected() {
        assert!(matches!(
            frame_from_dataframe(&sample_df(), "ts"),
            Err(StoreError::MissingTimestamp(_))
        ));
        assert!(matches!(
            frame_from_dataframe(&sample_df(), "venue"),
            Err(StoreError::TimestampType { .. })
        ));
    }

    fn sample_columns() -> ColumnMap {
        ColumnMap {
            lst_price: "lst".into(),
            lst_return: "lst_ret".into(),
            hedge_price: "hedge".into(),
            hedge_return: "hedge_ret".into(),
            funding: "funding".into(),
            cross_price: None,
        }
    }

    fn sample_output() -> SimulationOutput {
        let frame = frame_from_dataframe(&sample_df(), "timestamp").unwrap();
        let params = BacktestParams::new(
            sample_columns(),
            StrategyType::CapDev,
            0.01,
            1000.0,
            0.0004,
            0.0005,
        );
        Backtester::new(params).unwrap().run(&frame).unwrap()
    }

    #[test]
    fn output_table_has_one_column_per_field() {
        let output = sample_output();
        let df = output_to_dataframe(&output).unwrap();

        assert_eq!(df.height(), output.len());
        assert_eq!(df.width(), 33);
        assert_eq!(df.get_column_names()[0], OUTPUT_TIMESTAMP);
        let capital: Vec<f64> = df
            .column("capital")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(capital, output.records.iter().map(|r| r.capital).collect::<Vec<_>>());
        assert_eq!(df.column("rebalanced").unwrap().dtype(), &DataType::Boolean);
    }

    #[test]
    fn parquet_output_reads_back_as_a_frame() {
        let output = sample_output();
        let path = std::env::temp_dir()
            .join(format!("hedgeloop-store-{}.parquet", std::process::id()));
        write_output(&path, &output).unwrap();

        let frame = load_frame(&path, OUTPUT_TIMESTAMP).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(frame.index()[0], output.records[0].timestamp);
        assert_eq!(
            frame.column("leverage").unwrap()[2],
            Some(output.records[2].leverage)
        );
        assert!(frame.column("rebalanced").is_err());
    }
}
