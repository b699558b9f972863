// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <j.d.a.jewell@open.ac.uk>
//!
//! Output formatters for rqlite results.
//!
//! - **Table**: columnar output using `comfy-table`.
//! - **JSON**: pretty-printed JSON of the decoded result.

use std::fmt;

use comfy_table::{Cell, ContentArrangement, Table};
use rqlite_client::result::{ExecuteResult, QueryResult};
use rqlite_client::status::Nodes;
use rqlite_client::value::Value;
use serde::Serialize;

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown format '{other}'. Valid formats: table, json")),
        }
    }
}

/// Pretty-print any serializable value.
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}

/// Render one query result.
pub fn format_query(result: &QueryResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return format_json(result);
    }

    let mut table = new_table();
    table.set_header(result.columns.iter().map(Cell::new));
    for row in &result.values {
        table.add_row(row.iter().map(|v| Cell::new(value_to_cell(v))));
    }

    let rows = result.row_count();
    format!("{table}\n({rows} row{})", plural(rows))
}

/// Render one execute result.
pub fn format_execute(result: &ExecuteResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return format_json(result);
    }

    let mut table = field_table();
    if let Some(id) = result.last_insert_id {
        table.add_row(vec![Cell::new("last_insert_id"), Cell::new(id)]);
    }
    table.add_row(vec![Cell::new("rows_affected"), Cell::new(result.rows_affected)]);
    if let Some(time) = result.time {
        table.add_row(vec![Cell::new("time"), Cell::new(format!("{time:.6}s"))]);
    }
    table.to_string()
}

/// Render cluster membership, one node per row.
pub fn format_nodes(nodes: &Nodes, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return format_json(nodes);
    }

    let mut table = new_table();
    table.set_header(vec!["id", "api_addr", "addr", "reachable", "leader", "error"]);
    for (id, node) in &nodes.0 {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&node.api_addr),
            Cell::new(&node.addr),
            Cell::new(node.reachable),
            Cell::new(node.leader),
            Cell::new(&node.error),
        ]);
    }
    table.to_string()
}

/// Render any serializable value as a flattened `Field | Value` table.
///
/// Nested objects become dotted paths (`store.leader.node_id`).
pub fn format_fields<T: Serialize>(value: &T, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return format_json(value);
    }

    let json = match serde_json::to_value(value) {
        Ok(json) => json,
        Err(e) => return format!("<unprintable: {e}>"),
    };
    let mut fields = Vec::new();
    flatten("", &json, &mut fields);

    let mut table = field_table();
    for (key, val) in fields {
        table.add_row(vec![Cell::new(key), Cell::new(val)]);
    }
    table.to_string()
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, val, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_owned(), s.clone())),
        other => out.push((prefix.to_owned(), other.to_string())),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn field_table() -> Table {
    let mut table = new_table();
    table.set_header(vec![Cell::new("Field"), Cell::new("Value")]);
    table
}

/// Text cells are shown without quotes.
fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
