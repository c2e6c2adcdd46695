//! Template variables in raw query text.

use serde::{Deserialize, Serialize};

pub const TEMP_VAR_DASHBOARD_TIME: &str = ":dashboardTime:";
pub const TEMP_VAR_UPPER_DASHBOARD_TIME: &str = ":upperDashboardTime:";
pub const TEMP_VAR_INTERVAL: &str = ":interval:";

/// Variables supplied by the dashboard itself, never user-defined.
pub const PREDEFINED_TEMP_VARS: [&str; 3] = [
    TEMP_VAR_DASHBOARD_TIME,
    TEMP_VAR_UPPER_DASHBOARD_TIME,
    TEMP_VAR_INTERVAL,
];

/// Visualization width assumed when computing `:interval:`.
pub const DEFAULT_PIXELS: u64 = 333;

/// Duration assumed when the resolver gives no estimate.
pub const DEFAULT_DURATION_MS: u64 = 1000;

/// How a template value is rendered into query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemplateValueType {
    Database,
    Measurement,
    FieldKey,
    TagKey,
    TagValue,
    Csv,
    Map,
    Points,
    #[default]
    #[serde(other)]
    Constant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateValue {
    pub value: String,
    #[serde(rename = "type", default)]
    pub value_type: TemplateValueType,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub local_selected: bool,
}

impl TemplateValue {
    /// Text substituted for the variable.
    pub fn render(&self) -> String {
        match self.value_type {
            TemplateValueType::Database
            | TemplateValueType::Measurement
            | TemplateValueType::FieldKey
            | TemplateValueType::TagKey => format!("\"{}\"", self.value),
            TemplateValueType::TagValue => format!("'{}'", self.value),
            _ => self.value.clone(),
        }
    }
}

/// A dashboard template variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: String,
    pub temp_var: String,
    #[serde(default)]
    pub values: Vec<TemplateValue>,
}

impl Template {
    pub fn is_predefined(&self) -> bool {
        PREDEFINED_TEMP_VARS.contains(&self.temp_var.as_str())
    }

    /// The locally selected value, else the selected one.
    pub fn selected_value(&self) -> Option<&TemplateValue> {
        self.values
            .iter()
            .find(|v| v.local_selected)
            .or_else(|| self.values.iter().find(|v| v.selected))
    }
}

/// User-defined templates whose token appears in `query`.
pub fn find_user_defined_temp_vars<'a>(query: &str, templates: &'a [Template]) -> Vec<&'a Template> {
    if query.is_empty() {
        return Vec::new();
    }
    templates
        .iter()
        .filter(|t| !t.is_predefined() && query.contains(&t.temp_var))
        .collect()
}

/// Substitute every template's selected value, leaving `:interval:` for
/// [`replace_interval`].
pub fn replace_templates(query: &str, templates: &[Template]) -> String {
    templates
        .iter()
        .filter(|t| t.temp_var != TEMP_VAR_INTERVAL)
        .fold(query.to_string(), |acc, t| match t.selected_value() {
            Some(value) if !t.temp_var.is_empty() => acc.replace(&t.temp_var, &value.render()),
            _ => acc,
        })
}

/// Replace `:interval:` with the milliseconds covered by one pixel.
pub fn replace_interval(query: &str, pixels: u64, duration_ms: u64) -> String {
    if !query.contains(TEMP_VAR_INTERVAL) || pixels == 0 || duration_ms == 0 {
        return query.to_string();
    }
    let ms_per_pixel = duration_ms / pixels;
    query.replace(TEMP_VAR_INTERVAL, &format!("{}ms", ms_per_pixel))
}
