// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>

//! Query and execute results as returned by `/db/query` and `/db/execute`.
//!
//! Each statement in a batch gets its own result. A statement that fails
//! carries its message in `error`; this is data, not an [`RqliteError`]. Only
//! an error on the whole response envelope rejects the call.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RqliteError};
use crate::scan::{scan_row, ScanDest, ScanError};
use crate::value::Value;

/// Result of one read statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Declared column types, present when the server reports them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    /// Rows, each with one cell per column.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
    /// Statement-level error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server-side execution time in seconds, when timings were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(skip)]
    cursor: usize,
}

impl QueryResult {
    /// A result with the given columns and rows.
    pub fn new(columns: Vec<String>, values: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            values,
            ..Self::default()
        }
    }

    /// Total number of rows, independent of the cursor.
    pub fn row_count(&self) -> usize {
        self.values.len()
    }

    /// Advance the cursor and return the next row, or `None` once every row
    /// has been visited. The cursor never rewinds.
    pub fn next_row(&mut self) -> Option<QueryRow<'_>> {
        let values = self.values.get(self.cursor)?;
        self.cursor += 1;
        Some(QueryRow {
            columns: &self.columns,
            values,
        })
    }

    /// Statement-level error, if any. An empty message counts as none.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

/// A borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct QueryRow<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> QueryRow<'a> {
    /// Column names of the result this row belongs to.
    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    /// Raw cells.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Cell by column name.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.values.get(index)
    }

    /// Decode the row into `dests`, one destination per column.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] on a count mismatch or the first failed
    /// conversion. Destinations before the failing column keep their values.
    pub fn scan(&self, dests: &mut [&mut dyn ScanDest]) -> std::result::Result<(), ScanError> {
        scan_row(self.columns, self.values, dests)
    }
}

/// Result of one write statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResult {
    /// Row id of the last inserted row, if the statement inserted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_insert_id: Option<i64>,
    /// Number of rows changed.
    #[serde(default)]
    pub rows_affected: i64,
    /// Statement-level error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server-side execution time in seconds, when timings were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl ExecuteResult {
    /// Statement-level error, if any. An empty message counts as none.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

macro_rules! results_collection {
    ($(#[$meta:meta])* $name:ident, $item:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Vec<$item>);

        impl $name {
            /// Message of the first failed statement, in statement order.
            pub fn first_error(&self) -> Option<&str> {
                self.0.iter().find_map(|r| r.error())
            }

            /// Whether any statement failed.
            pub fn has_error(&self) -> bool {
                self.first_error().is_some()
            }

            /// Unwrap into the per-statement results.
            pub fn into_inner(self) -> Vec<$item> {
                self.0
            }
        }

        impl From<Vec<$item>> for $name {
            fn from(results: Vec<$item>) -> Self {
                Self(results)
            }
        }

        impl Deref for $name {
            type Target = [$item];

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl IntoIterator for $name {
            type Item = $item;
            type IntoIter = std::vec::IntoIter<$item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = &'a $item;
            type IntoIter = std::slice::Iter<'a, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

results_collection!(
    /// Per-statement results of a query batch, in statement order.
    QueryResults,
    QueryResult
);

results_collection!(
    /// Per-statement results of an execute batch, in statement order.
    ExecuteResults,
    ExecuteResult
);

/// Top-level response body of `/db/query` and `/db/execute`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    error: Option<String>,
}

impl<T> Envelope<T> {
    /// Per-statement results, or [`RqliteError::Rejected`] if the server
    /// refused the whole batch.
    pub(crate) fn into_results(self, operation: &'static str) -> Result<Vec<T>> {
        match self.error {
            Some(message) if !message.is_empty() => Err(RqliteError::Rejected { operation, message }),
            _ => Ok(self.results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY_BODY: &str = r#"{
        "results": [
            {
                "columns": ["id", "name"],
                "types": ["integer", "text"],
                "values": [[1, "fiona"], [2, null]],
                "time": 0.0015
            },
            {"error": "no such table: bar"}
        ],
        "time": 0.002
    }"#;

    #[test]
    fn test_decode_query_envelope() {
        let envelope: Envelope<QueryResult> = serde_json::from_str(QUERY_BODY).unwrap();
        let results = QueryResults::from(envelope.into_results("query").unwrap());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].columns, vec!["id", "name"]);
        assert_eq!(results[0].types, vec!["integer", "text"]);
        assert_eq!(results[0].row_count(), 2);
        assert_eq!(results[0].time, Some(0.0015));
        assert!(results[1].columns.is_empty());
        assert!(results[1].values.is_empty());
        assert_eq!(results.first_error(), Some("no such table: bar"));
        assert!(results.has_error());
    }

    #[test]
    fn test_envelope_error_rejects_batch() {
        let envelope: Envelope<QueryResult> =
            serde_json::from_str(r#"{"error": "unauthorized"}"#).unwrap();
        let err = envelope.into_results("query").unwrap_err();
        assert_eq!(err.to_string(), "query failed: unauthorized");
    }

    #[test]
    fn test_next_row_is_single_pass() {
        let mut result = QueryResult::new(
            vec!["n".into()],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );
        let mut seen = Vec::new();
        while let Some(row) = result.next_row() {
            let mut n = 0_i64;
            row.scan(&mut [&mut n]).unwrap();
            seen.push(n);
        }
        assert_eq!(seen, vec![1, 2]);
        assert!(result.next_row().is_none());
        assert!(result.next_row().is_none());
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn test_row_get_by_column() {
        let mut result = QueryResult::new(
            vec!["id".into(), "name".into()],
            vec![vec![Value::Integer(7), Value::Text("x".into())]],
        );
        let row = result.next_row().unwrap();
        assert_eq!(row.get("name"), Some(&Value::Text("x".into())));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_decode_execute_results() {
        let body = r#"{"results": [
            {"last_insert_id": 1, "rows_affected": 1, "time": 0.0001},
            {"rows_affected": 0},
            {"error": "UNIQUE constraint failed"}
        ]}"#;
        let envelope: Envelope<ExecuteResult> = serde_json::from_str(body).unwrap();
        let results = ExecuteResults::from(envelope.into_results("execute").unwrap());

        assert_eq!(results[0].last_insert_id, Some(1));
        assert_eq!(results[0].rows_affected, 1);
        assert_eq!(results[1].last_insert_id, None);
        assert_eq!(results.first_error(), Some("UNIQUE constraint failed"));
    }

    #[test]
    fn test_clean_results_have_no_error() {
        let results = ExecuteResults::from(vec![ExecuteResult::default(); 3]);
        assert!(!results.has_error());
        assert_eq!(results.first_error(), None);
    }
}
