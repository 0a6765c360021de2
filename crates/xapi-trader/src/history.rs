/*
[INPUT]:  Chart candles from getChartLastRequest, CSV files on disk
[OUTPUT]: OHLCV rows, decoded price bars, forward-filled joins
[POS]:    Backtest data layer - persistence of historical candles
[UPDATE]: When changing the CSV layout or price decoding
*/

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use xapi_adapter::{PeriodCode, RateInfoRecord};

const ARCHIVE_STAMP_FORMAT: &str = "%d.%m.%Y - %H.%M.%S";

/// One candle as stored on disk, prices still shifted by the symbol's digits.
///
/// Column order and names follow the venue's chart record:
/// `ctmString,ctm,open,high,low,close,vol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    #[serde(rename = "ctmString")]
    pub ctm_string: String,
    pub ctm: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vol: f64,
}

impl From<&RateInfoRecord> for OhlcvRow {
    fn from(record: &RateInfoRecord) -> Self {
        Self {
            ctm_string: record.ctm_string.clone(),
            ctm: record.ctm,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            vol: record.vol,
        }
    }
}

/// Candle with real prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Decode a stored row. The venue sends `open` as an integer shifted by
    /// `digits` and high/low/close as offsets from it.
    pub fn from_row(row: &OhlcvRow, digits: u32) -> Option<Self> {
        let scale = 10f64.powi(i32::try_from(digits).ok()?);
        Some(Self {
            time: DateTime::<Utc>::from_timestamp_millis(row.ctm)?,
            open: row.open / scale,
            high: (row.open + row.high) / scale,
            low: (row.open + row.low) / scale,
            close: (row.open + row.close) / scale,
            volume: row.vol,
        })
    }
}

pub fn write_rows(path: &Path, rows: &[OhlcvRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create data directory {}", parent.display()))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("open {}", path.display()))?;
    for row in rows {
        writer.serialize(row).context("write csv row")?;
    }
    writer.flush().context("flush csv")?;
    debug!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(())
}

/// Read rows in file order, keeping only the last `max_candles` when set.
pub fn read_rows(path: &Path, max_candles: Option<usize>) -> Result<Vec<OhlcvRow>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for record in reader.deserialize::<OhlcvRow>() {
        rows.push(record.with_context(|| format!("parse {}", path.display()))?);
    }
    if let Some(max) = max_candles {
        let skip = rows.len().saturating_sub(max);
        rows.drain(..skip);
    }
    Ok(rows)
}

/// Move an existing data file aside as `{symbol} {period} {modified}.csv` in the
/// same directory so a fresh pull never overwrites older data.
pub fn archive_existing(path: &Path, symbol: &str, period: PeriodCode) -> Result<Option<PathBuf>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("stat {}", path.display())),
    };
    let modified: DateTime<Local> = metadata
        .modified()
        .with_context(|| format!("modified time of {}", path.display()))?
        .into();
    let name = format!(
        "{symbol} {} {}.csv",
        period.name(),
        modified.format(ARCHIVE_STAMP_FORMAT)
    );
    let target = path.with_file_name(name);
    fs::rename(path, &target)
        .with_context(|| format!("archive {} to {}", path.display(), target.display()))?;
    info!(from = %path.display(), to = %target.display(), "previous data file archived");
    Ok(Some(target))
}

/// Left join on `ctm_string`, forward-filling gaps.
///
/// Each base row is paired with the matching `other` row, or with the last match
/// seen earlier in base order. Rows before the first match get `None`.
pub fn forward_fill_join<'a>(
    base: &'a [OhlcvRow],
    other: &'a [OhlcvRow],
) -> Vec<(&'a OhlcvRow, Option<&'a OhlcvRow>)> {
    let by_time: HashMap<&str, &OhlcvRow> = other
        .iter()
        .map(|row| (row.ctm_string.as_str(), row))
        .collect();

    let mut last = None;
    base.iter()
        .map(|row| {
            if let Some(found) = by_time.get(row.ctm_string.as_str()) {
                last = Some(*found);
            }
            (row, last)
        })
        .collect()
}
