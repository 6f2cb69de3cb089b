use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use metrics_common::{ChartError, Record};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS.iter() {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_number(raw: &str, column: &str, line: u64) -> Result<f64, ChartError> {
    parse_finite(raw).ok_or_else(|| ChartError::MalformedRecord {
        line,
        reason: format!("{} '{}' is not a finite number", column, raw),
    })
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, ChartError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| ChartError::MalformedRecord {
            line: 1,
            reason: format!("missing required column '{}'", name),
        })
}

fn csv_error(e: csv::Error) -> ChartError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    ChartError::MalformedRecord {
        line,
        reason: e.to_string(),
    }
}

/// Reads a `date,weight,fat[,...]` CSV and returns its rows sorted ascending by
/// date. Rows sharing a date keep their file order. Columns other than the
/// three required ones are kept as extra metrics when they hold a number.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>, ChartError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let date_idx = column_index(&headers, "date")?;
    let weight_idx = column_index(&headers, "weight")?;
    let fat_idx = column_index(&headers, "fat")?;

    let mut records: Vec<Record> = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(csv_error)?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let raw_date = field(date_idx);
        let date = parse_date(raw_date).ok_or_else(|| ChartError::MalformedRecord {
            line,
            reason: format!("date '{}' is not a calendar date", raw_date),
        })?;
        let weight = parse_number(field(weight_idx), "weight", line)?;
        let fat = parse_number(field(fat_idx), "fat", line)?;

        let mut record = Record::new(date, weight, fat);
        for (idx, name) in headers.iter().enumerate() {
            if idx == date_idx || idx == weight_idx || idx == fat_idx || name.is_empty() {
                continue;
            }
            if let Some(v) = parse_finite(field(idx)) {
                record.extra.insert(name.to_string(), v);
            }
        }
        records.push(record);
    }

    records.sort_by_key(|r| r.date);
    debug!("parsed {} records", records.len());
    Ok(records)
}

/// Loads records from a CSV file on disk.
pub fn load_records(path: &Path) -> Result<Vec<Record>, ChartError> {
    if !path.exists() {
        return Err(ChartError::MissingSource(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let file = File::open(path)
        .map_err(|e| ChartError::Io(format!("failed to open {}: {}", path.display(), e)))?;
    let records = read_records(file)?;
    info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_sorts_by_date_and_keeps_duplicates() {
        let csv = "date,weight,fat\n\
                   2024-01-03,70.1,20.3\n\
                   2024-01-01,70.5,20.6\n\
                   2024-01-03,70.0,20.2\n\
                   2024-01-02,70.3,20.4\n";
        let records = read_records(csv.as_bytes()).unwrap();
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 3)]
        );
        assert_eq!(records[2].weight, 70.1);
        assert_eq!(records[3].weight, 70.0);
    }

    #[test]
    fn test_column_order_formats_and_extras() {
        let csv = "fat, date ,weight,muscle,note\n\
                   21.0,2024/02/01,71.2,31.5,gym\n\
                   20.8,2024-02-02 07:30:00,71.0,,rest\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, d(2024, 2, 1));
        assert_eq!(records[0].fat, 21.0);
        assert_eq!(records[0].metric("muscle"), Some(31.5));
        assert_eq!(records[0].metric("note"), None);
        assert_eq!(records[1].date, d(2024, 2, 2));
        assert!(records[1].extra.is_empty());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let nan_weight = "date,weight,fat\n2024-01-01,NaN,20\n2024-01-02,70,20\n";
        match read_records(nan_weight.as_bytes()) {
            Err(ChartError::MalformedRecord { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("weight"));
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }

        let inf_fat = "date,weight,fat\n2024-01-01,70,20\n2024-01-02,70,inf\n";
        match read_records(inf_fat.as_bytes()) {
            Err(ChartError::MalformedRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected MalformedRecord, got {:?}", other),
        }

        let extras = "date,weight,fat,muscle,water\n2024-01-01,70,20,-inf,NaN\n";
        let records = read_records(extras.as_bytes()).unwrap();
        assert!(records[0].extra.is_empty());
    }

    #[test]
    fn test_header_only_is_empty() {
        let records = read_records("date,weight,fat\n".as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_rows() {
        let bad_date = "date,weight,fat\n2024-01-01,70,20\nyesterday,70,20\n";
        match read_records(bad_date.as_bytes()) {
            Err(ChartError::MalformedRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected MalformedRecord, got {:?}", other),
        }

        let bad_weight = "date,weight,fat\n2024-01-01,heavy,20\n";
        assert!(matches!(
            read_records(bad_weight.as_bytes()),
            Err(ChartError::MalformedRecord { .. })
        ));

        let no_fat = "date,weight\n2024-01-01,70\n";
        match read_records(no_fat.as_bytes()) {
            Err(ChartError::MalformedRecord { reason, .. }) => assert!(reason.contains("fat")),
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join(format!("series_loader_absent_{}.csv", std::process::id()));
        assert!(matches!(load_records(&path), Err(ChartError::MissingSource(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("series_loader_{}.csv", std::process::id()));
        std::fs::write(&path, "date,weight,fat\n2024-05-02,68.0,18.0\n2024-05-01,68.4,18.2\n").unwrap();
        let records = load_records(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, d(2024, 5, 1));
    }
}
