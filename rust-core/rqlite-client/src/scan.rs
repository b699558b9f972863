// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Typed row decoding.
//!
//! A row is scanned into a slice of destinations, one per column:
//!
//! ```
//! # use rqlite_client::{QueryResult, Value};
//! # let mut result = QueryResult::new(
//! #     vec!["id".into(), "name".into()],
//! #     vec![vec![Value::Integer(1), Value::Text("fiona".into())]],
//! # );
//! let mut id = 0_i64;
//! let mut name = String::new();
//! while let Some(row) = result.next_row() {
//!     row.scan(&mut [&mut id, &mut name])?;
//! }
//! assert_eq!((id, name.as_str()), (1, "fiona"));
//! # Ok::<(), rqlite_client::ScanError>(())
//! ```
//!
//! `NULL` cells leave their destination untouched. Conversions:
//!
//! | destination | integer | float | text |
//! |---|---|---|---|
//! | `String` | no | no | as is |
//! | `i64`, `isize` | as is | truncated toward zero | base-10 parse |
//! | `f64` | widened | as is | decimal parse |
//! | `DateTime<Utc>` | Unix seconds | Unix seconds, fraction dropped | RFC 3339 |
//!
//! Only these types implement [`ScanDest`], so scanning into anything else is
//! a compile error.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::value::Value;

/// Row decoding failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// The row's value count does not match its column count.
    #[error("invalid row: incorrect number of values, was {values}, needed {columns}")]
    ColumnCount {
        /// Number of columns in the result.
        columns: usize,
        /// Number of values in the row.
        values: usize,
    },

    /// The caller passed the wrong number of destinations.
    #[error("invalid number of destinations: was {destinations}, needed {values}")]
    DestinationCount {
        /// Number of destinations passed.
        destinations: usize,
        /// Number of values in the row.
        values: usize,
    },

    /// A cell could not be converted to its destination type.
    #[error("invalid conversion of column {index} from {from} to {to} (value {value})")]
    Conversion {
        /// Zero-based column index.
        index: usize,
        /// Wire type of the cell.
        from: &'static str,
        /// Destination type.
        to: &'static str,
        /// The offending cell, rendered.
        value: String,
    },
}

/// A typed slot a cell can be scanned into.
pub trait ScanDest {
    /// Destination type name used in [`ScanError::Conversion`].
    fn type_name(&self) -> &'static str;

    /// Overwrite `self` with `value`, or return `false` if the conversion is
    /// not supported. Never called with [`Value::Null`].
    fn assign(&mut self, value: &Value) -> bool;
}

/// Decode `values` into `dests`, stopping at the first failure.
///
/// Destinations before the failing column keep their new values.
pub(crate) fn scan_row(
    columns: &[String],
    values: &[Value],
    dests: &mut [&mut dyn ScanDest],
) -> Result<(), ScanError> {
    if columns.len() != values.len() {
        return Err(ScanError::ColumnCount {
            columns: columns.len(),
            values: values.len(),
        });
    }
    if dests.len() != values.len() {
        return Err(ScanError::DestinationCount {
            destinations: dests.len(),
            values: values.len(),
        });
    }

    for (index, (dest, value)) in dests.iter_mut().zip(values).enumerate() {
        if value.is_null() {
            continue;
        }
        if !dest.assign(value) {
            return Err(ScanError::Conversion {
                index,
                from: value.type_name(),
                to: dest.type_name(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn float_to_i64(x: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict bound.
    if x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Some(x.trunc() as i64)
    } else {
        None
    }
}

fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(n) => Some(*n),
        Value::Float(x) => float_to_i64(*x),
        Value::Text(s) => s.parse().ok(),
        Value::Null | Value::Bool(_) => None,
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(x) => Some(*x),
        Value::Integer(n) => Some(*n as f64),
        Value::Text(s) => s.parse().ok(),
        Value::Null | Value::Bool(_) => None,
    }
}

fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Integer(secs) => DateTime::from_timestamp(*secs, 0),
        Value::Float(x) => float_to_i64(*x).and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::Text(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Null | Value::Bool(_) => None,
    }
}

/// Store `converted` into `slot` if present.
fn store<T>(slot: &mut T, converted: Option<T>) -> bool {
    match converted {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

impl ScanDest for String {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn assign(&mut self, value: &Value) -> bool {
        match value {
            Value::Text(s) => {
                self.clone_from(s);
                true
            }
            _ => false,
        }
    }
}

impl ScanDest for i64 {
    fn type_name(&self) -> &'static str {
        "i64"
    }

    fn assign(&mut self, value: &Value) -> bool {
        store(self, to_i64(value))
    }
}

impl ScanDest for isize {
    fn type_name(&self) -> &'static str {
        "isize"
    }

    fn assign(&mut self, value: &Value) -> bool {
        store(self, to_i64(value).and_then(|n| isize::try_from(n).ok()))
    }
}

impl ScanDest for f64 {
    fn type_name(&self) -> &'static str {
        "f64"
    }

    fn assign(&mut self, value: &Value) -> bool {
        store(self, to_f64(value))
    }
}

impl ScanDest for DateTime<Utc> {
    fn type_name(&self) -> &'static str {
        "DateTime<Utc>"
    }

    fn assign(&mut self, value: &Value) -> bool {
        store(self, to_datetime(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn cols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{i}")).collect()
    }

    #[test]
    fn test_scan_mixed_row() {
        let values = vec![
            Value::Integer(1),
            Value::Text("fiona".into()),
            Value::Float(2.5),
            Value::Integer(1_641_067_851),
        ];
        let mut id = 0_i64;
        let mut name = String::new();
        let mut score = 0.0_f64;
        let mut at = DateTime::<Utc>::default();

        scan_row(&cols(4), &values, &mut [&mut id, &mut name, &mut score, &mut at]).unwrap();

        assert_eq!(id, 1);
        assert_eq!(name, "fiona");
        assert_eq!(score, 2.5);
        assert_eq!(at, Utc.with_ymd_and_hms(2022, 1, 1, 20, 10, 51).unwrap());
    }

    #[test]
    fn test_null_leaves_destination_untouched() {
        let mut name = String::from("previous");
        let mut n = 99_i64;
        scan_row(&cols(2), &[Value::Null, Value::Null], &mut [&mut name, &mut n]).unwrap();
        assert_eq!(name, "previous");
        assert_eq!(n, 99);
    }

    #[test]
    fn test_float_truncates_into_integers() {
        let mut a = 0_i64;
        let mut b = 0_isize;
        let values = [Value::Float(123.45), Value::Float(-7.9)];
        scan_row(&cols(2), &values, &mut [&mut a, &mut b]).unwrap();
        assert_eq!(a, 123);
        assert_eq!(b, -7);
    }

    #[test]
    fn test_text_parses_into_numbers() {
        let mut n = 0_i64;
        let mut x = 0.0_f64;
        let values = [Value::Text("42".into()), Value::Text("3.25".into())];
        scan_row(&cols(2), &values, &mut [&mut n, &mut x]).unwrap();
        assert_eq!(n, 42);
        assert_eq!(x, 3.25);
    }

    #[test]
    fn test_datetime_sources() {
        let expected = Utc.with_ymd_and_hms(2022, 1, 1, 20, 10, 51).unwrap();
        for value in [
            Value::Integer(1_641_067_851),
            Value::Float(1_641_067_851.9),
            Value::Text("2022-01-01T20:10:51Z".into()),
            Value::Text("2022-01-01T21:10:51+01:00".into()),
        ] {
            let mut at = DateTime::<Utc>::default();
            scan_row(&cols(1), std::slice::from_ref(&value), &mut [&mut at]).unwrap();
            assert_eq!(at, expected, "from {value}");
        }
    }

    #[test]
    fn test_string_rejects_numbers() {
        let mut name = String::new();
        let err = scan_row(&cols(1), &[Value::Integer(5)], &mut [&mut name]).unwrap_err();
        assert_eq!(
            err,
            ScanError::Conversion {
                index: 0,
                from: "integer",
                to: "string",
                value: "5".into(),
            }
        );
    }

    #[test]
    fn test_bad_text_is_conversion_error() {
        let mut n = 0_i64;
        let err = scan_row(&cols(1), &[Value::Text("abc".into())], &mut [&mut n]).unwrap_err();
        assert!(matches!(err, ScanError::Conversion { to: "i64", .. }));

        let mut at = DateTime::<Utc>::default();
        let err = scan_row(&cols(1), &[Value::Text("yesterday".into())], &mut [&mut at]).unwrap_err();
        assert!(matches!(err, ScanError::Conversion { to: "DateTime<Utc>", .. }));
    }

    #[test]
    fn test_non_finite_float_is_conversion_error() {
        for x in [f64::NAN, f64::INFINITY, 1e30] {
            let mut n = 0_i64;
            assert!(scan_row(&cols(1), &[Value::Float(x)], &mut [&mut n]).is_err());
        }
    }

    #[test]
    fn test_first_failure_keeps_earlier_values() {
        let mut a = 0_i64;
        let mut b = 0_i64;
        let mut c = 0_i64;
        let values = [Value::Integer(1), Value::Bool(true), Value::Integer(3)];
        let err = scan_row(&cols(3), &values, &mut [&mut a, &mut b, &mut c]).unwrap_err();
        assert!(matches!(err, ScanError::Conversion { index: 1, .. }));
        assert_eq!((a, b, c), (1, 0, 0));
    }

    #[test]
    fn test_count_mismatches() {
        let mut n = 0_i64;
        assert_eq!(
            scan_row(&cols(2), &[Value::Integer(1)], &mut [&mut n]).unwrap_err(),
            ScanError::ColumnCount { columns: 2, values: 1 }
        );
        assert_eq!(
            scan_row(&cols(2), &[Value::Integer(1), Value::Integer(2)], &mut [&mut n]).unwrap_err(),
            ScanError::DestinationCount { destinations: 1, values: 2 }
        );
    }

    proptest! {
        #[test]
        fn prop_integers_survive_every_numeric_destination(n in any::<i64>()) {
            let mut a = 0_i64;
            let mut b = 0_isize;
            let mut c = 0_i64;
            let values = [Value::Integer(n), Value::Integer(n), Value::Text(n.to_string())];
            scan_row(&cols(3), &values, &mut [&mut a, &mut b, &mut c]).unwrap();
            prop_assert_eq!(a, n);
            prop_assert_eq!(b as i64, n);
            prop_assert_eq!(c, n);
        }

        #[test]
        fn prop_float_truncation_moves_toward_zero(x in -1.0e15_f64..1.0e15) {
            let mut n = 0_i64;
            scan_row(&cols(1), &[Value::Float(x)], &mut [&mut n]).unwrap();
            prop_assert!((n as f64).abs() <= x.abs());
            prop_assert!((x - n as f64).abs() < 1.0);
        }
    }
}
