//! Capability bundle handed to node editors.

use super::ScriptSync;
use crate::flux::{Body, DeleteFuncNodeArgs, FluxTable, InputArg, ScriptStatus};
use crate::service::Service;

/// What a node editor may do and see during one update cycle.
///
/// Built fresh by [`ScriptSync::context`]; `data` and `body` are copies
/// taken at that moment, while the edit methods act on the live engine.
#[derive(Debug, Clone)]
pub struct EditorContext {
    sync: ScriptSync,
    pub service: Option<Service>,
    pub data: Vec<FluxTable>,
    pub body: Vec<Body>,
}

impl EditorContext {
    pub(super) fn new(
        sync: ScriptSync,
        service: Option<Service>,
        data: Vec<FluxTable>,
        body: Vec<Body>,
    ) -> Self {
        Self {
            sync,
            service,
            data,
            body,
        }
    }

    pub async fn add_node(
        &self,
        name: &str,
        body_id: &str,
        declaration_id: Option<&str>,
    ) -> ScriptStatus {
        self.sync.add_node(name, body_id, declaration_id).await
    }

    pub async fn change_arg(&self, input: &InputArg) -> ScriptStatus {
        self.sync.change_arg(input).await
    }

    pub async fn submit_script(&self) -> ScriptStatus {
        self.sync.submit_script().await
    }

    pub fn change_script(&self, text: impl Into<String>) {
        // The debounced parse runs on its own.
        drop(self.sync.update_script(text));
    }

    pub async fn delete_func_node(&self, ids: &DeleteFuncNodeArgs) -> ScriptStatus {
        self.sync.delete_func_node(ids).await
    }

    pub async fn generate_script(&self) -> ScriptStatus {
        self.sync.generate_script().await
    }

    pub async fn toggle_yield(
        &self,
        body_id: &str,
        declaration_id: Option<&str>,
        func_node_index: usize,
    ) -> ScriptStatus {
        self.sync
            .toggle_yield(body_id, declaration_id, func_node_index)
            .await
    }

    /// Computed against the body snapshot this context was built with.
    pub fn script_up_to_yield(
        &self,
        body_id: &str,
        declaration_id: Option<&str>,
        func_node_index: usize,
        is_yieldable: bool,
    ) -> String {
        crate::flux::builder::script_up_to_yield(
            body_id,
            declaration_id,
            func_node_index,
            is_yieldable,
            &self.body,
        )
    }
}
