/*
[INPUT]:  Historical candle rows and data directories
[OUTPUT]: CSV persistence, archiving and replay limit verification
[POS]:    Integration test layer - backtest data files
[UPDATE]: When changing the CSV layout or archive naming
*/

use xapi_adapter::PeriodCode;
use xapi_trader::OhlcvRow;
use xapi_trader::history::{archive_existing, read_rows, write_rows};

fn rows(count: i64) -> Vec<OhlcvRow> {
    (0..count)
        .map(|i| OhlcvRow {
            ctm_string: format!("Jan 8, 2024, {}:00:00 AM", i + 1),
            ctm: 1_704_672_000_000 + i * 900_000,
            open: 187_250.0 + i as f64,
            high: 12.0,
            low: -3.0,
            close: 7.0,
            vol: 100.0,
        })
        .collect()
}

#[test]
fn test_csv_layout_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("latest.csv");

    write_rows(&path, &rows(3)).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().next(), Some("ctmString,ctm,open,high,low,close,vol"));
    assert_eq!(read_rows(&path, None).unwrap(), rows(3));
}

#[test]
fn test_max_candles_keeps_most_recent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest.csv");
    write_rows(&path, &rows(5)).unwrap();

    let tail = read_rows(&path, Some(2)).unwrap();
    assert_eq!(tail, rows(5)[3..].to_vec());
    assert_eq!(read_rows(&path, Some(50)).unwrap().len(), 5);
}

#[test]
fn test_archive_existing_renames_by_symbol_and_period() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest.csv");

    assert_eq!(archive_existing(&path, "GBPJPY", PeriodCode::M15).unwrap(), None);

    write_rows(&path, &rows(1)).unwrap();
    let archived = archive_existing(&path, "GBPJPY", PeriodCode::M15)
        .unwrap()
        .unwrap();

    assert!(!path.exists());
    assert!(archived.exists());
    let name = archived.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("GBPJPY M15 "), "{name}");
    assert!(name.ends_with(".csv"));
    assert_eq!(read_rows(&archived, None).unwrap(), rows(1));
}
