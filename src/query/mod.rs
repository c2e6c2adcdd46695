//! Query drafts for non-script queries.
//!
//! A cell's persisted queries are copied into a [`DraftStore`] when the
//! editor opens. Drafts change only through:
//!
//! - [`QueryTransition`]s, applied by [`DraftStore::dispatch`]
//! - the raw-text path, [`DraftStore::edit_raw_text`], which round-trips
//!   through a [`crate::service::ConfigResolver`]
//!
//! On save, drafts are rendered back into [`CellQuery`]s.

pub mod cell;
pub mod config;
pub mod influxql;
pub mod store;
pub mod template;
pub mod transitions;

pub use cell::{Cell, CellQuery};
pub use config::{Field, FieldType, GroupBy, QueryConfig, QueryStatus, Source, SourceLinks, TimeRange};
pub use influxql::build_query;
pub use store::DraftStore;
pub use template::{Template, TemplateValue, TemplateValueType};
pub use transitions::{Namespace, QueryTransition, Tag};
