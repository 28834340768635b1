//! Stop-detection records.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use ub_table::TableError;

/// One detected stop of a device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StopRecord {
    /// Anonymous device identifier.
    pub device_id: String,
    /// Month of the stop (`YYYY-MM`).
    pub year_month: String,
    /// Whether the stop is at the device's identified home; `None` when
    /// the field is empty.
    #[serde(rename = "home__identified", deserialize_with = "flag")]
    pub home: Option<bool>,
    /// Whether the stop is at the device's identified work place; `None`
    /// when the field is empty.
    #[serde(rename = "work__identified", deserialize_with = "flag")]
    pub work: Option<bool>,
    /// Cluster label of the place; non-positive labels mark movement.
    pub place_label: i64,
    /// Stop centre longitude.
    #[serde(rename = "center__lon")]
    pub lon: f64,
    /// Stop centre latitude.
    #[serde(rename = "center__lat")]
    pub lat: f64,
    /// Sequence number of the stop.
    pub stop_number: i64,
    /// Start of the stop interval.
    #[serde(rename = "interval__start", deserialize_with = "timestamp")]
    pub start: NaiveDateTime,
    /// Stop duration.
    pub duration: f64,
}

impl StopRecord {
    /// Whether the stop belongs to a place rather than to movement.
    #[must_use]
    pub const fn at_place(&self) -> bool {
        self.place_label > 0
    }

    /// Whether both anchor flags are known to be unset. A stop with an
    /// unknown flag is neither an anchor nor a third place.
    #[must_use]
    pub const fn off_anchor(&self) -> bool {
        matches!((self.home, self.work), (Some(false), Some(false)))
    }
}

/// Reads one period's stop file.
///
/// # Errors
///
/// Returns [`TableError::InputFormat`] if the file is missing or any row
/// is malformed.
pub fn load_stops(path: &Path) -> Result<Vec<StopRecord>, TableError> {
    ub_table::io::read_csv(path)
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Ok(Some(true)),
        "0" | "0.0" | "false" => Ok(Some(false)),
        "" => Ok(None),
        other => Err(serde::de::Error::custom(format!("not a flag: {other:?}"))),
    }
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("not a timestamp: {raw:?}")))
}

/// Parses the timestamp layouts stop files are written with.
///
/// Offsets are dropped; the local wall-clock time is kept.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    const HEADER: &str = "device_id,year_month,home__identified,work__identified,place_label,center__lon,center__lat,stop_number,interval__start,duration\n";

    #[test]
    fn reads_stop_rows() {
        let text = format!(
            "{HEADER}d1,2020-01,1,0,3,19.05,47.5,1,2020-01-15 08:30:00,3600\n\
             d1,2020-01,False,True,-1,19.06,47.51,2,2020-01-16T09:00:00,120.5\n"
        );
        let stops: Vec<StopRecord> = ub_table::io::read_csv_from(text.as_bytes(), b',').unwrap();

        assert_eq!(stops.len(), 2);
        assert_eq!((stops[0].home, stops[0].work), (Some(true), Some(false)));
        assert!(stops[0].at_place());
        assert_eq!(stops[0].start.day(), 15);
        assert_eq!((stops[1].home, stops[1].work), (Some(false), Some(true)));
        assert!(!stops[1].at_place());
        assert!((stops[1].duration - 120.5).abs() < 1e-12);
    }

    #[test]
    fn empty_flag_is_unknown() {
        let text = format!(
            "{HEADER}d1,2020-01,,0,3,19.05,47.5,1,2020-01-15 08:30:00,60\n\
             d1,2020-01,0,0.0,3,19.05,47.5,2,2020-01-15 09:30:00,60\n"
        );
        let stops: Vec<StopRecord> = ub_table::io::read_csv_from(text.as_bytes(), b',').unwrap();

        assert_eq!((stops[0].home, stops[0].work), (None, Some(false)));
        assert!(!stops[0].off_anchor());
        assert!(stops[1].off_anchor());
    }

    #[test]
    fn timestamps_with_offset_keep_wall_clock() {
        let ts = parse_timestamp("2020-03-31T23:30:00+02:00").unwrap();
        assert_eq!((ts.day(), ts.hour()), (31, 23));
        assert_eq!(parse_timestamp("2020-03-01").map(|t| t.day()), Some(1));
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn malformed_row_is_rejected() {
        let text = format!("{HEADER}d1,2020-01,maybe,0,3,19.05,47.5,1,2020-01-15 08:30:00,60\n");
        let result: Result<Vec<StopRecord>, _> = ub_table::io::read_csv_from(text.as_bytes(), b',');
        assert!(result.is_err());
    }

    #[test]
    fn missing_period_file_is_input_format_error() {
        let err = load_stops(Path::new("/nonexistent/ub_mobility/2019-05.csv")).unwrap_err();
        assert!(matches!(err, TableError::InputFormat { .. }));
    }
}
