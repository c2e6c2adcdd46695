//! Structured query configuration, the value each draft holds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fill value used when a query does not choose one.
pub const NULL_STRING: &str = "null";

/// Group-by time chosen automatically from the dashboard width.
pub const AUTO_GROUP_BY: &str = "auto";

/// A data source the query runs against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub default: bool,
    pub links: SourceLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(default)]
    pub proxy: String,
    #[serde(default)]
    pub queries: String,
}

impl Source {
    /// The link persisted with a saved query.
    pub fn self_link(&self) -> &str {
        &self.links.self_link
    }
}

/// Kind of a field entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Field,
    Func,
    Wildcard,
    Regex,
    Integer,
    Number,
}

/// A selected field, or a function applied to fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Field {
    pub value: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Field>,
}

impl Field {
    pub fn field(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            field_type: FieldType::Field,
            alias: None,
            args: Vec::new(),
        }
    }

    /// `func(field) AS "func_field"`.
    pub fn func(func: impl Into<String>, field: impl Into<String>) -> Self {
        let func = func.into();
        let field = field.into();
        Self {
            alias: Some(format!("{}_{}", func, field)),
            value: func,
            field_type: FieldType::Func,
            args: vec![Self::field(field)],
        }
    }

    /// True when this entry selects `name`, directly or as a function
    /// argument.
    pub fn references(&self, name: &str) -> bool {
        match self.field_type {
            FieldType::Func => self.args.iter().any(|a| a.references(name)),
            _ => self.value == name,
        }
    }

    /// The plain fields underneath any function wrapping.
    pub fn underlying(&self) -> Vec<Field> {
        match self.field_type {
            FieldType::Func => self.args.iter().flat_map(Field::underlying).collect(),
            _ => vec![Self {
                alias: None,
                args: Vec::new(),
                ..self.clone()
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupBy {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub upper: Option<String>,
    pub lower: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeShift {
    pub label: String,
    pub unit: String,
    pub quantity: String,
}

/// Per-draft execution status reported by the visualization layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryStatus {
    #[serde(default)]
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<String>,
}

impl QueryStatus {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }
}

fn default_true() -> bool {
    true
}

/// A query configuration, persisted or in draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub measurement: Option<String>,
    #[serde(default)]
    pub retention_policy: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default = "default_true")]
    pub are_tags_accepted: bool,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub range: Option<TimeRange>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub status: Option<QueryStatus>,
    #[serde(default)]
    pub shifts: Vec<TimeShift>,
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default = "default_true")]
    pub is_query_supported_by_explorer: bool,
}

impl QueryConfig {
    /// An empty configuration with the given id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            database: None,
            measurement: None,
            retention_policy: None,
            fields: Vec::new(),
            tags: BTreeMap::new(),
            group_by: GroupBy::default(),
            are_tags_accepted: true,
            raw_text: None,
            range: None,
            source: None,
            status: None,
            shifts: Vec::new(),
            fill: Some(NULL_STRING.to_string()),
            is_query_supported_by_explorer: true,
        }
    }

    /// Raw text, treating an empty string as absent.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref().filter(|t| !t.is_empty())
    }

    /// A draft can be saved when it has raw text, or a measurement, a
    /// database and at least one field.
    pub fn is_saveable(&self) -> bool {
        let non_empty = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        self.raw_text().is_some()
            || (non_empty(&self.measurement) && non_empty(&self.database) && !self.fields.is_empty())
    }
}
