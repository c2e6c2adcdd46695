//! Result tables returned by the execution service.
//!
//! Responses are annotated CSV: one or more blocks separated by a blank
//! line, each with `#datatype`/`#group`/`#default` annotation rows, a header
//! row and data rows. Rows are split into tables by the `table` column.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::service::{ServiceError, ServiceResult};

/// Columns left out of a table's display name.
const NAME_EXCLUDED_COLUMNS: [&str; 4] = ["_start", "_stop", "result", "table"];

/// One result table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxTable {
    pub id: String,
    pub name: String,
    pub result: String,
    /// Header row first, then data rows.
    pub data: Vec<Vec<String>>,
    pub partition_key: BTreeMap<String, String>,
    pub data_types: BTreeMap<String, String>,
}

/// Tables from one execution and whether the response was capped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesResult {
    pub tables: Vec<FluxTable>,
    pub did_truncate: bool,
}

/// Cap a response body at `max_bytes`, cutting back to the last complete
/// line. Returns the kept text and whether anything was dropped.
pub fn truncate_response(body: &[u8], max_bytes: usize) -> (String, bool) {
    if body.len() <= max_bytes {
        return (String::from_utf8_lossy(body).into_owned(), false);
    }
    let capped = &body[..max_bytes];
    let end = capped
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    (String::from_utf8_lossy(&capped[..end]).into_owned(), true)
}

/// Decode an annotated CSV response into tables.
pub fn parse_response(body: &str) -> ServiceResult<Vec<FluxTable>> {
    let normalized = body.replace("\r\n", "\n");
    let mut tables = Vec::new();
    for block in normalized.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        tables.extend(parse_block(block)?);
    }
    Ok(tables)
}

fn parse_block(block: &str) -> ServiceResult<Vec<FluxTable>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(block.as_bytes());

    let mut annotations: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut header: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for record in reader.records() {
        let record = record?;
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        match fields.first() {
            Some(first) if first.starts_with('#') => {
                annotations.insert(first.clone(), fields[1..].to_vec());
            }
            _ if header.is_none() => header = Some(fields[1..].to_vec()),
            _ => rows.push(fields.get(1..).map(<[String]>::to_vec).unwrap_or_default()),
        }
    }

    let Some(header) = header else {
        return Ok(Vec::new());
    };

    if let Some(error_col) = header.iter().position(|h| h == "error") {
        let message = rows
            .first()
            .and_then(|r| r.get(error_col))
            .cloned()
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ServiceError::Execution(message));
    }

    let column = |name: &str| header.iter().position(|h| h == name);
    let table_col = column("table");
    let result_col = column("result");
    let groups = annotations.get("#group").cloned().unwrap_or_default();
    let datatypes = annotations.get("#datatype").cloned().unwrap_or_default();
    let defaults = annotations.get("#default").cloned().unwrap_or_default();

    let mut grouped: Vec<(String, Vec<Vec<String>>)> = Vec::new();
    for row in rows {
        let key = table_col
            .and_then(|i| row.get(i))
            .cloned()
            .unwrap_or_default();
        match grouped.iter_mut().find(|(k, _)| *k == key) {
            Some((_, group)) => group.push(row),
            None => grouped.push((key, vec![row])),
        }
    }

    let tables = grouped
        .into_iter()
        .map(|(table, rows)| {
            let first = rows.first().cloned().unwrap_or_default();
            let result = result_col
                .and_then(|i| {
                    first
                        .get(i)
                        .filter(|v| !v.is_empty())
                        .or_else(|| defaults.get(i))
                })
                .cloned()
                .unwrap_or_default();

            let partition_key: BTreeMap<String, String> = header
                .iter()
                .enumerate()
                .filter(|(i, _)| groups.get(*i).is_some_and(|g| g == "true"))
                .map(|(i, h)| (h.clone(), first.get(i).cloned().unwrap_or_default()))
                .collect();

            let data_types: BTreeMap<String, String> = header
                .iter()
                .enumerate()
                .filter_map(|(i, h)| datatypes.get(i).map(|t| (h.clone(), t.clone())))
                .collect();

            let name = header
                .iter()
                .filter(|h| !NAME_EXCLUDED_COLUMNS.contains(&h.as_str()))
                .filter_map(|h| partition_key.get(h).map(|v| format!("{}={}", h, v)))
                .collect::<Vec<_>>()
                .join(" ");

            let mut data = Vec::with_capacity(rows.len() + 1);
            data.push(header.clone());
            data.extend(rows);

            FluxTable {
                id: format!("{}-{}", result, table),
                name,
                result,
                data,
                partition_key,
                data_types,
            }
        })
        .collect();

    Ok(tables)
}
