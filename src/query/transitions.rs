//! Named transitions over a single query configuration.
//!
//! Every transition is a pure function `QueryConfig -> QueryConfig`; the
//! draft store looks up the target draft, applies the transition and
//! replaces the draft in place.

use serde::{Deserialize, Serialize};

use super::config::{
    Field, FieldType, GroupBy, QueryConfig, QueryStatus, Source, TimeShift, AUTO_GROUP_BY,
};

/// A database and retention policy pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    pub database: String,
    #[serde(default)]
    pub retention_policy: Option<String>,
}

/// One tag key/value selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// The closed set of edits a draft accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QueryTransition {
    ChooseNamespace(Namespace),
    ChooseMeasurement { measurement: String },
    ToggleField { field: Field },
    ApplyFuncsToField {
        field: Field,
        funcs: Vec<Field>,
        #[serde(default)]
        group_by: Option<GroupBy>,
    },
    RemoveFuncs { fields: Vec<Field> },
    ChooseTag(Tag),
    GroupByTag { key: String },
    ToggleTagAcceptance,
    GroupByTime { time: Option<String> },
    Fill { value: String },
    EditRawText { text: String },
    EditQueryStatus { status: QueryStatus },
    TimeShift { shift: Option<TimeShift> },
    AddInitialField {
        field: Field,
        #[serde(default)]
        group_by: GroupBy,
    },
}

impl QueryTransition {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChooseNamespace(_) => "choose_namespace",
            Self::ChooseMeasurement { .. } => "choose_measurement",
            Self::ToggleField { .. } => "toggle_field",
            Self::ApplyFuncsToField { .. } => "apply_funcs_to_field",
            Self::RemoveFuncs { .. } => "remove_funcs",
            Self::ChooseTag(_) => "choose_tag",
            Self::GroupByTag { .. } => "group_by_tag",
            Self::ToggleTagAcceptance => "toggle_tag_acceptance",
            Self::GroupByTime { .. } => "group_by_time",
            Self::Fill { .. } => "fill",
            Self::EditRawText { .. } => "edit_raw_text",
            Self::EditQueryStatus { .. } => "edit_query_status",
            Self::TimeShift { .. } => "time_shift",
            Self::AddInitialField { .. } => "add_initial_field",
        }
    }

    /// Apply this transition, returning the next configuration.
    pub fn apply(&self, query: &QueryConfig) -> QueryConfig {
        let mut next = query.clone();
        match self {
            Self::ChooseNamespace(ns) => {
                next.database = Some(ns.database.clone());
                next.retention_policy = ns.retention_policy.clone();
                next.measurement = None;
                next.fields.clear();
                next.tags.clear();
                next.group_by = GroupBy::default();
            }
            Self::ChooseMeasurement { measurement } => {
                next.measurement = Some(measurement.clone());
                next.fields.clear();
                next.tags.clear();
                next.are_tags_accepted = true;
                next.group_by = GroupBy {
                    time: query.group_by.time.clone(),
                    tags: Vec::new(),
                };
            }
            Self::ToggleField { field } => {
                if query.fields.iter().any(|f| f.references(&field.value)) {
                    next.fields.retain(|f| !f.references(&field.value));
                    if next.fields.is_empty() {
                        next.group_by.time = None;
                    }
                } else {
                    next.fields.push(field.clone());
                }
            }
            Self::ApplyFuncsToField {
                field,
                funcs,
                group_by,
            } => apply_funcs_to_field(&mut next, field, funcs, group_by.as_ref()),
            Self::RemoveFuncs { fields } => {
                let mut plain: Vec<Field> = Vec::new();
                for f in fields.iter().flat_map(Field::underlying) {
                    if !plain.contains(&f) {
                        plain.push(f);
                    }
                }
                next.fields = plain;
                next.group_by.time = None;
            }
            Self::ChooseTag(tag) => {
                let values = next.tags.entry(tag.key.clone()).or_default();
                if let Some(pos) = values.iter().position(|v| *v == tag.value) {
                    values.remove(pos);
                } else {
                    values.push(tag.value.clone());
                }
                if values.is_empty() {
                    next.tags.remove(&tag.key);
                }
            }
            Self::GroupByTag { key } => {
                if let Some(pos) = next.group_by.tags.iter().position(|t| t == key) {
                    next.group_by.tags.remove(pos);
                } else {
                    next.group_by.tags.push(key.clone());
                }
            }
            Self::ToggleTagAcceptance => next.are_tags_accepted = !query.are_tags_accepted,
            Self::GroupByTime { time } => next.group_by.time = time.clone(),
            Self::Fill { value } => next.fill = Some(value.clone()),
            Self::EditRawText { text } => next.raw_text = Some(text.clone()),
            Self::EditQueryStatus { status } => next.status = Some(status.clone()),
            Self::TimeShift { shift } => next.shifts = shift.iter().cloned().collect(),
            Self::AddInitialField { field, group_by } => {
                next.fields = vec![field.clone()];
                next.group_by = group_by.clone();
            }
        }
        next
    }
}

fn apply_funcs_to_field(
    query: &mut QueryConfig,
    field: &Field,
    funcs: &[Field],
    group_by: Option<&GroupBy>,
) {
    let replacement: Vec<Field> = if funcs.is_empty() {
        vec![Field::field(field.value.clone())]
    } else {
        funcs
            .iter()
            .map(|func| Field {
                value: func.value.clone(),
                field_type: FieldType::Func,
                alias: Some(format!("{}_{}", func.value, field.value)),
                args: vec![Field::field(field.value.clone())],
            })
            .collect()
    };

    let mut fields: Vec<Field> = Vec::with_capacity(query.fields.len() + replacement.len());
    let mut inserted = false;
    for existing in query.fields.drain(..) {
        if existing.references(&field.value) {
            if !inserted {
                fields.extend(replacement.iter().cloned());
                inserted = true;
            }
        } else {
            fields.push(existing);
        }
    }
    if !inserted {
        fields.extend(replacement);
    }
    query.fields = fields;

    if let Some(group_by) = group_by {
        query.group_by = group_by.clone();
    }
    if !funcs.is_empty() && query.group_by.time.is_none() {
        query.group_by.time = Some(AUTO_GROUP_BY.to_string());
    }
}

/// Source a draft keeps after a transition: the new value when the
/// transition set one, otherwise the previous one.
pub fn next_source(prev: &QueryConfig, next: &QueryConfig) -> Option<Source> {
    next.source.clone().or_else(|| prev.source.clone())
}
