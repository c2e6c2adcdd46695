//! Cell editor coordinator.
//!
//! Ties the draft store and the script engine to one cell: builds the
//! drafts when the editor opens, tracks the selected service and source, and
//! renders the drafts back into a cell on save.

use crate::query::{Cell, DraftStore, QueryConfig, QueryStatus, Source, Template};
use crate::service::Service;
use crate::sync::ScriptSync;

/// Editing session for one dashboard cell.
#[derive(Debug)]
pub struct CellEditor {
    cell: Cell,
    sync: ScriptSync,
    drafts: DraftStore,
    sources: Vec<Source>,
    default_source: Source,
    selected_service: Option<Service>,
    selected_source: Option<Source>,
    last_status: Option<(String, QueryStatus)>,
}

/// Source the cell's first query was saved against, or `default` when the
/// cell has no queries or names a source that no longer exists.
pub fn initial_source(cell: &Cell, sources: &[Source], default: &Source) -> Source {
    let Some(link) = cell.queries.first().and_then(|q| q.source.as_deref()) else {
        return default.clone();
    };
    match sources.iter().find(|s| s.self_link() == link) {
        Some(source) => source.clone(),
        None => {
            tracing::debug!(link, "cell source not found, using default");
            default.clone()
        }
    }
}

impl CellEditor {
    pub fn new(cell: Cell, sync: ScriptSync, sources: Vec<Source>, default_source: Source) -> Self {
        let initial = initial_source(&cell, &sources, &default_source);
        let drafts = DraftStore::from_queries(&cell.queries, Some(initial));
        Self {
            cell,
            sync,
            drafts,
            sources,
            default_source,
            selected_service: None,
            selected_source: None,
            last_status: None,
        }
    }

    #[must_use]
    pub fn with_templates(mut self, templates: Vec<Template>) -> Self {
        self.drafts.set_templates(templates);
        self
    }

    /// Width and fallback duration used to compute `:interval:`.
    #[must_use]
    pub fn with_interval_defaults(mut self, pixels: u64, default_duration_ms: u64) -> Self {
        self.drafts = self.drafts.with_interval_defaults(pixels, default_duration_ms);
        self
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn sync(&self) -> &ScriptSync {
        &self.sync
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn drafts_mut(&mut self) -> &mut DraftStore {
        &mut self.drafts
    }

    pub fn service(&self) -> Option<&Service> {
        self.selected_service.as_ref()
    }

    /// Script mode is on once a service has been chosen.
    pub fn is_flux_source(&self) -> bool {
        self.selected_service.is_some()
    }

    /// The source queries run against: the selected one, else the first
    /// draft's source if it is still known, else the default.
    pub fn source(&self) -> Source {
        if let Some(selected) = &self.selected_source {
            return selected.clone();
        }
        self.drafts
            .drafts()
            .first()
            .and_then(|q| q.source.as_ref())
            .and_then(|draft_source| {
                self.sources
                    .iter()
                    .find(|s| s.self_link() == draft_source.self_link())
            })
            .cloned()
            .unwrap_or_else(|| self.default_source.clone())
    }

    /// Switch to `service` and point every draft at `source`.
    pub fn change_service(&mut self, service: Service, source: Source) {
        self.drafts.change_source(Some(source.clone()));
        self.selected_service = Some(service);
        self.selected_source = Some(source);
    }

    /// Record a status reported by the visualization layer. Repeats of the
    /// last applied status are ignored.
    pub fn apply_query_status(&mut self, query_id: &str, status: QueryStatus) {
        let next = (query_id.to_string(), status);
        if self.last_status.as_ref() == Some(&next) {
            return;
        }
        self.drafts.apply_query_status(&next.0, next.1.clone());
        self.last_status = Some(next);
    }

    /// The active draft as the query builder should see it.
    pub fn active_query(&self) -> Option<QueryConfig> {
        self.drafts.active_query()
    }

    pub fn is_saveable(&self) -> bool {
        self.drafts.is_saveable()
    }

    /// Load the function catalog and, in script mode, run the script.
    pub async fn open(&self) {
        self.sync.load_suggestions().await;
        if let Some(service) = &self.selected_service {
            self.sync.fetch_time_series(service).await;
        }
    }

    /// The edited cell with every draft rendered back into a query.
    pub fn save(&self) -> Cell {
        Cell {
            queries: self.drafts.to_cell_queries(),
            ..self.cell.clone()
        }
    }
}
