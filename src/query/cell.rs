//! Persisted cell shape.

use serde::{Deserialize, Serialize};

use super::config::QueryConfig;

/// One persisted query: resolved text, structured snapshot and the self
/// link of the source it runs against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub query_config: Option<QueryConfig>,
    #[serde(default)]
    pub source: Option<String>,
}

impl CellQuery {
    /// The structured config this query was saved with. Queries saved
    /// without one come back as raw text.
    pub fn to_config(&self) -> QueryConfig {
        match &self.query_config {
            Some(config) => config.clone(),
            None => {
                let mut config = QueryConfig::with_id("");
                if !self.query.is_empty() {
                    config.raw_text = Some(self.query.clone());
                }
                config
            }
        }
    }
}

/// A dashboard cell being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub i: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub cell_type: String,
    #[serde(default)]
    pub queries: Vec<CellQuery>,
}
