//! Script synchronization engine.
//!
//! Keeps three views of one script consistent:
//!
//! ```text
//!   script text ──(debounce)──▶ parse ──▶ Program ──▶ Vec<Body>
//!        ▲                                                │
//!        └──────────── structural edit (builder) ◀────────┘
//! ```
//!
//! Text edits go through [`ScriptSync::update_script`], which stores the
//! text at once and parses it after a quiet period. Structural edits build
//! a new script from the current body tree and parse it immediately,
//! cancelling any pending debounced parse.
//!
//! Every parse takes a sequence number. A result that arrives after a newer
//! parse has started is discarded, so the last caller wins.

mod context;
mod timeseries;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::Instrument;

pub use context::EditorContext;

use crate::flux::builder;
use crate::flux::{body_nodes, body_to_script, Body, DeleteFuncNodeArgs, FluxTable, InputArg};
use crate::flux::{Program, ScriptStatus, Suggestion};
use crate::observability::script_span;
use crate::service::{FluxParser, Notification, Notifier, QueryExecutor, Service};

/// Quiet period before a text edit is parsed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
struct SyncState {
    script: String,
    ast: Program,
    body: Vec<Body>,
    status: ScriptStatus,
    suggestions: Vec<Suggestion>,
    suggestions_loaded: bool,
    data: Vec<FluxTable>,
}

/// Point-in-time copy of the engine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSnapshot {
    pub script: String,
    pub ast: Program,
    pub body: Vec<Body>,
    pub status: ScriptStatus,
    pub data: Vec<FluxTable>,
}

struct Inner {
    parser: Arc<dyn FluxParser>,
    executor: Arc<dyn QueryExecutor>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<SyncState>,
    debounce: Duration,
    /// Bumped by every text edit and every immediate parse; a debounced
    /// parse only runs if the value is unchanged when its timer fires.
    debounce_seq: AtomicU64,
    /// Bumped by every parse; results from older parses are dropped.
    parse_seq: AtomicU64,
}

/// Handle to the script engine. Clones share state.
#[derive(Clone)]
pub struct ScriptSync {
    inner: Arc<Inner>,
}

impl ScriptSync {
    pub fn new(
        parser: Arc<dyn FluxParser>,
        executor: Arc<dyn QueryExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_debounce(parser, executor, notifier, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(
        parser: Arc<dyn FluxParser>,
        executor: Arc<dyn QueryExecutor>,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                parser,
                executor,
                notifier,
                state: Mutex::new(SyncState {
                    ast: Program::empty(),
                    ..SyncState::default()
                }),
                debounce,
                debounce_seq: AtomicU64::new(0),
                parse_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Seed the canonical script without parsing it.
    #[must_use]
    pub fn with_script(self, script: impl Into<String>) -> Self {
        self.state().script = script.into();
        self
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn script(&self) -> String {
        self.state().script.clone()
    }

    pub fn status(&self) -> ScriptStatus {
        self.state().status.clone()
    }

    pub fn body(&self) -> Vec<Body> {
        self.state().body.clone()
    }

    pub fn ast(&self) -> Program {
        self.state().ast.clone()
    }

    pub fn data(&self) -> Vec<FluxTable> {
        self.state().data.clone()
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.state().suggestions.clone()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.state();
        SyncSnapshot {
            script: state.script.clone(),
            ast: state.ast.clone(),
            body: state.body.clone(),
            status: state.status.clone(),
            data: state.data.clone(),
        }
    }

    /// Edit callbacks and current data bundled for one update cycle.
    pub fn context(&self, service: Option<Service>) -> EditorContext {
        let (data, body) = {
            let state = self.state();
            (state.data.clone(), state.body.clone())
        };
        EditorContext::new(self.clone(), service, data, body)
    }

    // =========================================================================
    // Text edits and parsing
    // =========================================================================

    /// Store `text` as the canonical script and parse it once edits have
    /// been quiet for the debounce window.
    ///
    /// The returned handle completes when the scheduled parse has run, or
    /// has been superseded.
    pub fn update_script(&self, text: impl Into<String>) -> JoinHandle<()> {
        let text = text.into();
        self.state().script = text.clone();
        let seq = self.inner.debounce_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.debounce).await;
            if this.inner.debounce_seq.load(Ordering::SeqCst) != seq {
                tracing::debug!(seq, "debounced parse superseded");
                return;
            }
            this.parse(&text, false).await;
        })
    }

    /// Parse `text` now, cancelling any pending debounced parse. With
    /// `propagate`, a successful parse also makes `text` the canonical
    /// script.
    pub async fn request_parse(&self, text: &str, propagate: bool) -> ScriptStatus {
        self.inner.debounce_seq.fetch_add(1, Ordering::SeqCst);
        self.parse(text, propagate).await
    }

    async fn parse(&self, text: &str, propagate: bool) -> ScriptStatus {
        let seq = self.inner.parse_seq.fetch_add(1, Ordering::SeqCst) + 1;

        if text.is_empty() {
            let mut state = self.state();
            state.status = ScriptStatus::None;
            state.body.clear();
            state.ast = Program::empty();
            if propagate {
                state.script.clear();
            }
            return ScriptStatus::None;
        }

        let result = self
            .inner
            .parser
            .parse(text)
            .instrument(script_span("parse", seq))
            .await;

        if self.inner.parse_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "discarding superseded parse result");
            return self.status();
        }

        let mut state = self.state();
        match result {
            Ok(ast) => {
                state.body = body_nodes(&ast, &state.suggestions);
                state.ast = ast;
                state.status = ScriptStatus::Success;
                if propagate {
                    state.script = text.to_string();
                }
            }
            Err(e) => {
                tracing::error!(seq, error = %e, "could not parse script");
                state.status = ScriptStatus::error(e.diagnostic());
            }
        }
        state.status.clone()
    }

    /// Parse the canonical script immediately.
    pub async fn submit_script(&self) -> ScriptStatus {
        let script = self.script();
        self.request_parse(&script, true).await
    }

    /// Rebuild the script from the current body tree and parse it.
    pub async fn generate_script(&self) -> ScriptStatus {
        let script = body_to_script(&self.state().body);
        self.request_parse(&script, true).await
    }

    /// Parse the canonical script and report success to the user.
    pub async fn validate(&self) -> ScriptStatus {
        self.inner.debounce_seq.fetch_add(1, Ordering::SeqCst);
        let script = self.script();
        let seq = self.inner.parse_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self
            .inner
            .parser
            .parse(&script)
            .instrument(script_span("validate", seq))
            .await;

        if self.inner.parse_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "discarding superseded validation result");
            return self.status();
        }

        let mut state = self.state();
        match result {
            Ok(ast) => {
                state.body = body_nodes(&ast, &state.suggestions);
                state.ast = ast;
                state.status = ScriptStatus::Success;
                drop(state);
                self.inner.notifier.notify(Notification::ValidateSuccess);
                ScriptStatus::Success
            }
            Err(e) => {
                tracing::error!(seq, error = %e, "could not parse script");
                state.status = ScriptStatus::error(e.diagnostic());
                state.status.clone()
            }
        }
    }

    /// Fetch the function catalog once. Failures are logged and leave the
    /// catalog empty.
    pub async fn load_suggestions(&self) -> usize {
        {
            let state = self.state();
            if state.suggestions_loaded {
                return state.suggestions.len();
            }
        }
        match self.inner.parser.suggestions().await {
            Ok(suggestions) => {
                let mut state = self.state();
                state.suggestions = suggestions;
                state.suggestions_loaded = true;
                state.suggestions.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not get function suggestions");
                0
            }
        }
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Append a call to the addressed chain.
    pub async fn add_node(
        &self,
        name: &str,
        body_id: &str,
        declaration_id: Option<&str>,
    ) -> ScriptStatus {
        let script = builder::add_node(name, body_id, declaration_id, &self.state().body);
        self.request_parse(&script, true).await
    }

    /// Apply an argument edit to the body tree, regenerating the script when
    /// the edit asks for it.
    pub async fn change_arg(&self, input: &InputArg) -> ScriptStatus {
        let status = {
            let mut state = self.state();
            state.body = builder::change_arg(input, &state.body);
            state.status.clone()
        };
        if input.generate {
            return self.generate_script().await;
        }
        status
    }

    pub async fn delete_body(&self, body_id: &str) -> ScriptStatus {
        let script = builder::delete_body(body_id, &self.state().body);
        self.request_parse(&script, true).await
    }

    pub async fn delete_func_node(&self, ids: &DeleteFuncNodeArgs) -> ScriptStatus {
        let script = builder::delete_func_node(ids, &self.state().body);
        self.request_parse(&script, true).await
    }

    pub async fn toggle_yield(
        &self,
        body_id: &str,
        declaration_id: Option<&str>,
        func_node_index: usize,
    ) -> ScriptStatus {
        let script =
            builder::toggle_yield(body_id, declaration_id, func_node_index, &self.state().body);
        self.request_parse(&script, true).await
    }

    /// Add a `from` stage, seeding an empty script with one.
    pub async fn append_from(&self) -> ScriptStatus {
        let script = builder::append_from(&self.script());
        self.request_parse(&script, true).await
    }

    pub async fn append_join(&self) -> ScriptStatus {
        let script = builder::append_join(&self.script());
        self.request_parse(&script, true).await
    }

    /// Script ending at the addressed call. Does not parse.
    pub fn script_up_to_yield(
        &self,
        body_id: &str,
        declaration_id: Option<&str>,
        func_node_index: usize,
        is_yieldable: bool,
    ) -> String {
        builder::script_up_to_yield(
            body_id,
            declaration_id,
            func_node_index,
            is_yieldable,
            &self.state().body,
        )
    }
}

impl std::fmt::Debug for ScriptSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ScriptSync")
            .field("script", &state.script)
            .field("status", &state.status)
            .field("bodies", &state.body.len())
            .finish()
    }
}
