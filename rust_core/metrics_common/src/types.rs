use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ChartError;

/// One row of the body-metrics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub weight: f64,
    pub fat: f64,
    /// Any further numeric column of the source, keyed by header name.
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

impl Record {
    pub fn new(date: NaiveDate, weight: f64, fat: f64) -> Self {
        Record {
            date,
            weight,
            fat,
            extra: BTreeMap::new(),
        }
    }

    /// Value of a metric by column name. `weight` and `fat` always resolve.
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "weight" => Some(self.weight),
            "fat" => Some(self.fat),
            other => self.extra.get(other).copied(),
        }
    }
}

/// A named, date-ascending sequence of observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    points: Vec<(NaiveDate, f64)>,
}

impl Series {
    /// Builds a series from points, stably sorting them by date.
    pub fn new(name: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(d, _)| *d);
        Series {
            name: name.into(),
            points,
        }
    }

    /// Extracts one metric from date-sorted records. Records without the
    /// metric are skipped.
    pub fn from_records(records: &[Record], metric: &str) -> Result<Self, ChartError> {
        let points: Vec<(NaiveDate, f64)> = records
            .iter()
            .filter_map(|r| r.metric(metric).map(|v| (r.date, v)))
            .collect();
        if points.is_empty() && !records.is_empty() {
            return Err(ChartError::InvalidParameter(format!(
                "no record carries metric '{}'",
                metric
            )));
        }
        Ok(Series::new(metric, points))
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }
}

/// Rolling statistics aligned index-for-index with a `Series`.
/// `None` marks positions where the window is not yet full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    pub window_short: usize,
    pub window_long: usize,
    pub num_std_dev: f64,
    pub ma_short: Vec<Option<f64>>,
    pub ma_long: Vec<Option<f64>>,
    pub std_long: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl DerivedSeries {
    pub fn len(&self) -> usize {
        self.ma_long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ma_long.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_series_sorted_and_duplicates_kept() {
        let s = Series::new("weight", vec![(d(3), 3.0), (d(1), 1.0), (d(3), 4.0), (d(2), 2.0)]);
        assert_eq!(s.values(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.first_date(), Some(d(1)));
        assert_eq!(s.last_date(), Some(d(3)));
    }

    #[test]
    fn test_from_records_extra_metric() {
        let mut a = Record::new(d(1), 70.0, 20.0);
        a.extra.insert("muscle".to_string(), 30.5);
        let b = Record::new(d(2), 69.5, 19.8);
        let records = vec![a, b];

        let fat = Series::from_records(&records, "fat").unwrap();
        assert_eq!(fat.values(), vec![20.0, 19.8]);

        let muscle = Series::from_records(&records, "muscle").unwrap();
        assert_eq!(muscle.len(), 1);
        assert_eq!(muscle.points()[0], (d(1), 30.5));

        match Series::from_records(&records, "bmi") {
            Err(ChartError::InvalidParameter(_)) => {}
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }
}
