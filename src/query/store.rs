//! The ordered working set of query drafts.

use tracing::Instrument;
use uuid::Uuid;

use super::cell::CellQuery;
use super::config::{QueryConfig, QueryStatus, Source, TimeRange};
use super::influxql::build_query;
use super::template::{
    find_user_defined_temp_vars, replace_interval, replace_templates, Template,
    DEFAULT_DURATION_MS, DEFAULT_PIXELS, TEMP_VAR_DASHBOARD_TIME,
};
use super::transitions::{next_source, QueryTransition};
use crate::observability::draft_span;
use crate::service::{ConfigResolver, QueryRequest, ServiceError, ServiceResult};

fn new_draft_id() -> String {
    Uuid::new_v4().to_string()
}

/// Drafts being edited, addressed by their draft id.
///
/// Draft ids are assigned when the draft is created and never change, even
/// when a transition replaces the draft.
#[derive(Debug, Clone)]
pub struct DraftStore {
    drafts: Vec<QueryConfig>,
    active_index: usize,
    initial_source: Option<Source>,
    templates: Vec<Template>,
    pixels: u64,
    default_duration_ms: u64,
}

impl DraftStore {
    /// One draft per persisted query, or a single empty draft when there
    /// are none. Every draft gets a fresh id and `initial_source`.
    pub fn from_queries(queries: &[CellQuery], initial_source: Option<Source>) -> Self {
        let mut drafts: Vec<QueryConfig> = queries
            .iter()
            .map(|q| QueryConfig {
                id: new_draft_id(),
                source: initial_source.clone(),
                ..q.to_config()
            })
            .collect();
        if drafts.is_empty() {
            drafts.push(QueryConfig {
                source: initial_source.clone(),
                ..QueryConfig::with_id(new_draft_id())
            });
        }

        Self {
            drafts,
            active_index: 0,
            initial_source,
            templates: Vec::new(),
            pixels: DEFAULT_PIXELS,
            default_duration_ms: DEFAULT_DURATION_MS,
        }
    }

    /// A store over existing drafts, keeping their ids.
    pub fn from_drafts(drafts: Vec<QueryConfig>, initial_source: Option<Source>) -> Self {
        Self {
            drafts,
            active_index: 0,
            initial_source,
            templates: Vec::new(),
            pixels: DEFAULT_PIXELS,
            default_duration_ms: DEFAULT_DURATION_MS,
        }
    }

    #[must_use]
    pub fn with_templates(mut self, templates: Vec<Template>) -> Self {
        self.templates = templates;
        self
    }

    /// Width and fallback duration used to compute `:interval:`.
    #[must_use]
    pub fn with_interval_defaults(mut self, pixels: u64, default_duration_ms: u64) -> Self {
        self.pixels = pixels;
        self.default_duration_ms = default_duration_ms;
        self
    }

    pub fn drafts(&self) -> &[QueryConfig] {
        &self.drafts
    }

    pub fn draft(&self, query_id: &str) -> Option<&QueryConfig> {
        self.drafts.iter().find(|q| q.id == query_id)
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn set_templates(&mut self, templates: Vec<Template>) {
        self.templates = templates;
    }

    pub fn initial_source(&self) -> Option<&Source> {
        self.initial_source.as_ref()
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn set_active_index(&mut self, index: usize) {
        self.active_index = index;
    }

    /// The active draft, falling back to the first one. Drafts whose raw
    /// text uses a user-defined template variable are reported as not
    /// supported by the explorer.
    pub fn active_query(&self) -> Option<QueryConfig> {
        let mut active = self
            .drafts
            .get(self.active_index)
            .or_else(|| self.drafts.first())?
            .clone();
        let text = active.raw_text.as_deref().unwrap_or_default();
        if !find_user_defined_temp_vars(text, &self.templates).is_empty() {
            active.is_query_supported_by_explorer = false;
        }
        Some(active)
    }

    /// Apply `transition` to the draft `query_id`, in place. Returns false
    /// when no draft has that id.
    pub fn dispatch(&mut self, query_id: &str, transition: &QueryTransition) -> bool {
        let Some(slot) = self.drafts.iter_mut().find(|q| q.id == query_id) else {
            tracing::debug!(query_id, transition = transition.name(), "no draft with id");
            return false;
        };

        let mut next = transition.apply(slot);
        next.id = slot.id.clone();
        next.source = next_source(slot, &next);
        *slot = next;
        true
    }

    /// Append an empty draft with the initial source and make it active.
    /// Returns the new draft's id.
    pub fn add_draft(&mut self) -> String {
        let id = new_draft_id();
        self.drafts.push(QueryConfig {
            source: self.initial_source.clone(),
            ..QueryConfig::with_id(id.clone())
        });
        self.active_index = self.drafts.len() - 1;
        id
    }

    /// Remove the draft at `index`. Out-of-range indexes are ignored.
    pub fn delete_draft(&mut self, index: usize) {
        if index < self.drafts.len() {
            self.drafts.remove(index);
        }
    }

    /// Every draft can be saved.
    pub fn is_saveable(&self) -> bool {
        self.drafts.iter().all(QueryConfig::is_saveable)
    }

    /// Point every draft at `source`.
    pub fn change_source(&mut self, source: Option<Source>) {
        for draft in &mut self.drafts {
            draft.source = source.clone();
        }
    }

    /// Record a status reported for `query_id`.
    pub fn apply_query_status(&mut self, query_id: &str, status: QueryStatus) -> bool {
        self.dispatch(query_id, &QueryTransition::EditQueryStatus { status })
    }

    /// Resolve edited raw text into a structured config and apply it to the
    /// draft `query_id`.
    ///
    /// Drafts using user-defined template variables keep their structured
    /// fields and only take the text. On failure the error is logged and
    /// returned, and no draft changes.
    pub async fn edit_raw_text<R>(
        &mut self,
        resolver: &R,
        url: &str,
        query_id: &str,
        text: &str,
    ) -> ServiceResult<()>
    where
        R: ConfigResolver + ?Sized,
    {
        let uses_user_vars = !find_user_defined_temp_vars(text, &self.templates).is_empty();

        let resolved = match self
            .resolve_config(resolver, url, query_id, text)
            .instrument(draft_span("edit_raw_text", query_id))
            .await
        {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(query_id, error = %e, "failed to resolve raw query text");
                return Err(e);
            }
        };

        let Some(slot) = self.drafts.iter_mut().find(|q| q.id == query_id) else {
            tracing::debug!(query_id, "draft removed before resolution finished");
            return Ok(());
        };

        if uses_user_vars {
            slot.raw_text = Some(text.to_string());
            slot.status = Some(QueryStatus::loading());
            slot.is_query_supported_by_explorer = false;
            return Ok(());
        }

        *slot = QueryConfig {
            id: slot.id.clone(),
            raw_text: Some(text.to_string()),
            status: Some(QueryStatus::loading()),
            range: slot.range.take(),
            group_by: std::mem::take(&mut slot.group_by),
            source: slot.source.take(),
            is_query_supported_by_explorer: true,
            ..resolved
        };
        Ok(())
    }

    /// Two-pass resolution: the first pass estimates the query's duration,
    /// which sizes `:interval:` for the second.
    async fn resolve_config<R>(
        &self,
        resolver: &R,
        url: &str,
        query_id: &str,
        text: &str,
    ) -> ServiceResult<QueryConfig>
    where
        R: ConfigResolver + ?Sized,
    {
        let query = replace_templates(text, &self.templates);
        let first = resolver
            .resolve(
                url,
                &[QueryRequest {
                    query: query.clone(),
                    id: query_id.to_string(),
                }],
            )
            .await?;
        let duration_ms = first
            .first()
            .and_then(|q| q.duration_ms)
            .unwrap_or(self.default_duration_ms);
        tracing::debug!(duration_ms, "estimated query duration");

        let query = replace_interval(&query, self.pixels, duration_ms);
        let second = resolver
            .resolve(
                url,
                &[QueryRequest {
                    query,
                    id: query_id.to_string(),
                }],
            )
            .await?;

        second
            .into_iter()
            .find(|q| q.id == query_id)
            .map(|q| q.query_config)
            .ok_or_else(|| ServiceError::MissingQuery(query_id.to_string()))
    }

    /// Persisted form of every draft: raw text when present, otherwise the
    /// structured query over the draft's range (default
    /// `:dashboardTime:`).
    pub fn to_cell_queries(&self) -> Vec<CellQuery> {
        self.drafts
            .iter()
            .map(|q| {
                let query = match q.raw_text() {
                    Some(text) => text.to_string(),
                    None => {
                        let range = q.range.clone().unwrap_or_else(|| TimeRange {
                            upper: None,
                            lower: TEMP_VAR_DASHBOARD_TIME.to_string(),
                        });
                        build_query(&range, q).unwrap_or_default()
                    }
                };
                CellQuery {
                    query,
                    query_config: Some(q.clone()),
                    source: q.source.as_ref().map(|s| s.self_link().to_string()),
                }
            })
            .collect()
    }
}
