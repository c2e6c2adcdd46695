//! Render a structured query configuration as InfluxQL.

use std::sync::LazyLock;

use regex::Regex;

use super::config::{Field, FieldType, GroupBy, QueryConfig, TimeRange, AUTO_GROUP_BY};
use super::template::TEMP_VAR_INTERVAL;

static TIMESTAMP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}").unwrap());

/// Absolute timestamps are quoted, relative expressions are not.
fn time_bound(bound: &str) -> String {
    if TIMESTAMP_PATTERN.is_match(bound) {
        format!("'{}'", bound)
    } else {
        bound.to_string()
    }
}

fn field_expr(field: &Field) -> String {
    match field.field_type {
        FieldType::Field if field.value == "*" => "*".to_string(),
        FieldType::Field => format!("\"{}\"", field.value),
        FieldType::Wildcard => "*".to_string(),
        FieldType::Regex => format!("/{}/", field.value),
        FieldType::Integer | FieldType::Number => field.value.clone(),
        FieldType::Func => {
            let args = field.args.iter().map(field_expr).collect::<Vec<_>>().join(", ");
            match &field.alias {
                Some(alias) => format!("{}({}) AS \"{}\"", field.value, args, alias),
                None => format!("{}({})", field.value, args),
            }
        }
    }
}

fn where_clause(range: &TimeRange, config: &QueryConfig) -> String {
    let mut clauses = Vec::new();
    if !range.lower.is_empty() {
        clauses.push(format!("time > {}", time_bound(&range.lower)));
    }
    if let Some(upper) = range.upper.as_deref().filter(|u| !u.is_empty()) {
        clauses.push(format!("time < {}", time_bound(upper)));
    }

    let operator = if config.are_tags_accepted { "=" } else { "!=" };
    for (key, values) in &config.tags {
        let parts: Vec<String> = values
            .iter()
            .map(|v| format!("\"{}\"{}'{}'", key, operator, v))
            .collect();
        match parts.len() {
            0 => {}
            1 => clauses.extend(parts),
            _ => clauses.push(format!("({})", parts.join(" OR "))),
        }
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

fn group_by_clause(group_by: &GroupBy) -> String {
    let mut parts = Vec::new();
    if let Some(time) = group_by.time.as_deref().filter(|t| !t.is_empty()) {
        let time = if time == AUTO_GROUP_BY { TEMP_VAR_INTERVAL } else { time };
        parts.push(format!("time({})", time));
    }
    if !group_by.tags.is_empty() {
        parts.push(
            group_by
                .tags
                .iter()
                .map(|t| format!("\"{}\"", t))
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" GROUP BY {}", parts.join(", "))
    }
}

/// Build the query text for `config` over `range`.
///
/// Returns `None` unless a database, a measurement and at least one field
/// are selected. Time shifts are not rendered.
pub fn build_query(range: &TimeRange, config: &QueryConfig) -> Option<String> {
    let database = config.database.as_deref().filter(|d| !d.is_empty())?;
    let measurement = config.measurement.as_deref().filter(|m| !m.is_empty())?;
    if config.fields.is_empty() {
        return None;
    }

    let rp = config
        .retention_policy
        .as_deref()
        .filter(|rp| !rp.is_empty())
        .map(|rp| format!("\"{}\"", rp))
        .unwrap_or_default();
    let fields = config.fields.iter().map(field_expr).collect::<Vec<_>>().join(", ");

    let mut query = format!(
        "SELECT {} FROM \"{}\".{}.\"{}\"",
        fields, database, rp, measurement
    );
    query.push_str(&where_clause(range, config));
    query.push_str(&group_by_clause(&config.group_by));
    if config.group_by.time.is_some() {
        if let Some(fill) = config.fill.as_deref().filter(|f| !f.is_empty()) {
            query.push_str(&format!(" FILL({})", fill));
        }
    }
    Some(query)
}
