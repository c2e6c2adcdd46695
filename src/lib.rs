//! # cellsync
//!
//! Synchronization core for a dashboard cell editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  CellEditor (editor)                     │
//! │   selected service/source, open, save                    │
//! └─────────────────────────────────────────────────────────┘
//!            │                               │
//!            ▼ script queries                ▼ explorer queries
//! ┌───────────────────────────┐   ┌───────────────────────────┐
//! │     ScriptSync (sync)      │   │     DraftStore (query)     │
//! │ script ─▶ AST ─▶ body tree │   │ transitions, raw text,     │
//! │ debounce, time series      │   │ templates, InfluxQL        │
//! └───────────────────────────┘   └───────────────────────────┘
//!            │  ▲                            │
//!            │  └── builder (flux) ──┐       │
//!            ▼                       │       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │     Remote services (service): parser, suggestions,      │
//! │     execution, config resolution, notifications          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod editor;
pub mod flux;
pub mod observability;
pub mod query;
pub mod service;
pub mod sync;

pub use editor::CellEditor;
pub use flux::{Body, Program, ScriptStatus, TimeSeriesResult};
pub use query::{DraftStore, QueryConfig, QueryTransition};
pub use service::{ServiceError, ServiceResult};
pub use sync::ScriptSync;
