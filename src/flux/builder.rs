//! Structural edits over the body tree.
//!
//! Every edit except `change_arg` is a pure function from the current tree
//! to a new script string; the caller feeds that string back into the parse
//! path, which recomputes the tree. Bodies an edit does not touch keep their
//! original source text.

use serde::{Deserialize, Serialize};

use super::body::{funcs_to_script, Arg, Body, BodyKind, Func, BODY_SEPARATOR};
use super::suggestion::ArgType;

/// Stage seeded into an empty script by `append_from`.
pub const NEW_FROM: &str = "from(bucket: \"telegraf/autogen\")\n\t|> range(start: -15m)";

/// Stage appended by `append_join`.
pub const NEW_JOIN: &str = "join(tables: {tbl1: tbl1, tbl2: tbl2}, on: [\"host\"])";

/// An argument edit coming from a node editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputArg {
    pub body_id: String,
    #[serde(default)]
    pub declaration_id: Option<String>,
    pub func_id: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    /// Regenerate and re-parse the whole script after applying the edit.
    #[serde(default)]
    pub generate: bool,
}

/// Addresses a call to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFuncNodeArgs {
    pub body_id: String,
    #[serde(default)]
    pub declaration_id: Option<String>,
    pub func_id: String,
    /// Position of a `yield()` attached to the deleted call, removed with it.
    #[serde(default)]
    pub yield_node_index: Option<usize>,
}

/// Append a call named `name` to the addressed chain.
pub fn add_node(name: &str, body_id: &str, declaration_id: Option<&str>, bodies: &[Body]) -> String {
    rebuild(bodies, body_id, |body| {
        edit_chain(body, declaration_id, |funcs| {
            let mut next = funcs.to_vec();
            next.push(Func::call(String::new(), name));
            next
        })
    })
}

/// Set (or add) an argument on an existing call.
///
/// Unlike the other edits this returns a new tree rather than a script, so
/// that argument typing can be reflected before the script is regenerated.
/// The touched body's source is refreshed from its nodes.
pub fn change_arg(input: &InputArg, bodies: &[Body]) -> Vec<Body> {
    let mut next = bodies.to_vec();
    let Some(body) = next.iter_mut().find(|b| b.id == input.body_id) else {
        return next;
    };

    let funcs = match input.declaration_id.as_deref() {
        Some(declaration_id) => match body.declarations.iter_mut().find(|d| d.id == declaration_id) {
            Some(declaration) => &mut declaration.funcs,
            None => return next,
        },
        None => &mut body.funcs,
    };

    let Some(func) = funcs.iter_mut().find(|f| f.id == input.func_id) else {
        return next;
    };

    match func.args.iter_mut().find(|a| a.key == input.key) {
        Some(arg) => {
            arg.value = input.value.clone();
            arg.arg_type = input.arg_type;
        }
        None => func
            .args
            .push(Arg::new(input.key.clone(), input.value.clone(), input.arg_type)),
    }
    func.source = func.to_script();

    for declaration in &mut body.declarations {
        if !declaration.funcs.is_empty() {
            declaration.source = declaration.to_script();
        }
    }
    body.source = body.to_script();

    next
}

/// Remove a whole top-level body.
pub fn delete_body(body_id: &str, bodies: &[Body]) -> String {
    join_bodies(
        bodies
            .iter()
            .filter(|b| b.id != body_id)
            .map(Body::source_or_script),
    )
}

/// Remove one call (and an attached `yield()`) from a chain. A declaration
/// left without calls is removed entirely.
pub fn delete_func_node(ids: &DeleteFuncNodeArgs, bodies: &[Body]) -> String {
    rebuild(bodies, &ids.body_id, |body| {
        edit_chain(body, ids.declaration_id.as_deref(), |funcs| {
            funcs
                .iter()
                .enumerate()
                .filter(|(i, f)| {
                    f.id != ids.func_id && !(ids.yield_node_index == Some(*i) && f.is_yield())
                })
                .map(|(_, f)| f.clone())
                .collect()
        })
    })
}

/// Add a new `from` stage, or seed the script with one when it is empty.
pub fn append_from(script: &str) -> String {
    append_stage(script, NEW_FROM)
}

/// Add a join stage after the current script.
pub fn append_join(script: &str) -> String {
    append_stage(script, NEW_JOIN)
}

/// Insert a `yield()` after the addressed call, or remove the one already
/// there.
pub fn toggle_yield(
    body_id: &str,
    declaration_id: Option<&str>,
    func_node_index: usize,
    bodies: &[Body],
) -> String {
    rebuild(bodies, body_id, |body| {
        let yield_name = declaration_id
            .and_then(|id| body.declaration(id))
            .map(|d| d.name.clone());

        edit_chain(body, declaration_id, |funcs| {
            let mut next = funcs.to_vec();
            if func_node_index >= next.len() {
                return next;
            }
            let insert_at = func_node_index + 1;
            if next.get(insert_at).is_some_and(Func::is_yield) {
                next.remove(insert_at);
            } else {
                next.insert(insert_at, yield_func(yield_name.as_deref()));
            }
            next
        })
    })
}

/// Script ending at the addressed call, used to preview a partial pipeline.
///
/// Bodies before the addressed one are kept, bodies after it are dropped,
/// and yields earlier in the chain are stripped. When `is_yieldable` is set
/// the addressed call is itself the yield; otherwise a `yield()` is appended
/// after it.
pub fn script_up_to_yield(
    body_id: &str,
    declaration_id: Option<&str>,
    func_node_index: usize,
    is_yieldable: bool,
    bodies: &[Body],
) -> String {
    let Some(position) = bodies.iter().position(|b| b.id == body_id) else {
        return join_bodies(bodies.iter().map(Body::source_or_script));
    };
    let body = &bodies[position];

    let truncate = |funcs: &[Func]| -> String {
        let Some(node) = funcs.get(func_node_index) else {
            return funcs_to_script(funcs);
        };
        let mut chain: Vec<Func> = funcs[..func_node_index]
            .iter()
            .filter(|f| !f.is_yield())
            .cloned()
            .collect();
        chain.push(node.clone());
        if !is_yieldable {
            chain.push(yield_func(None));
        }
        funcs_to_script(&chain)
    };

    let index = declaration_id.and_then(|id| body.declarations.iter().position(|d| d.id == id));
    let target = match index {
        Some(index) => {
            let mut lines: Vec<String> = body.declarations[..index]
                .iter()
                .map(|d| d.to_script())
                .collect();
            let declaration = &body.declarations[index];
            lines.push(format!("{} = {}", declaration.name, truncate(&declaration.funcs)));
            lines.join("\n")
        }
        None if declaration_id.is_none() && has_chain(body) => truncate(&body.funcs),
        None => body.source_or_script(),
    };

    join_bodies(
        bodies[..position]
            .iter()
            .map(Body::source_or_script)
            .chain(std::iter::once(target)),
    )
}

fn yield_func(name: Option<&str>) -> Func {
    let mut func = Func::call(String::new(), "yield");
    if let Some(name) = name {
        func.args.push(Arg::new("name", name, ArgType::String));
    }
    func.source = func.to_script();
    func
}

fn append_stage(script: &str, stage: &str) -> String {
    let trimmed = script.trim();
    if trimmed.is_empty() {
        return stage.to_string();
    }
    format!("{}{}{}", trimmed, BODY_SEPARATOR, stage)
}

/// Rebuild the script, rendering the addressed body with `edit` and every
/// other body from its source.
fn rebuild(bodies: &[Body], body_id: &str, edit: impl Fn(&Body) -> String) -> String {
    join_bodies(bodies.iter().map(|body| {
        if body.id == body_id {
            edit(body)
        } else {
            body.source_or_script()
        }
    }))
}

/// Render `body` with the addressed chain replaced by `edit(chain)`.
///
/// A chain that cannot be addressed (an unknown declaration id, or no id on
/// a body without a top-level chain) leaves the body as it was.
fn edit_chain(
    body: &Body,
    declaration_id: Option<&str>,
    edit: impl FnOnce(&[Func]) -> Vec<Func>,
) -> String {
    let target = match declaration_id {
        Some(id) => match body.declaration(id) {
            Some(target) => target,
            None => return body.source_or_script(),
        },
        None if has_chain(body) => return funcs_to_script(&edit(&body.funcs)),
        None => return body.source_or_script(),
    };

    let mut edit = Some(edit);
    let lines: Vec<String> = body
        .declarations
        .iter()
        .filter_map(|declaration| {
            if declaration.id != target.id {
                return Some(declaration.to_script());
            }
            let funcs = edit.take().map(|f| f(&declaration.funcs)).unwrap_or_default();
            if funcs.is_empty() {
                None
            } else {
                Some(format!("{} = {}", declaration.name, funcs_to_script(&funcs)))
            }
        })
        .collect();
    lines.join("\n")
}

fn has_chain(body: &Body) -> bool {
    body.kind == BodyKind::Expression && !body.funcs.is_empty()
}

fn join_bodies(parts: impl Iterator<Item = String>) -> String {
    parts
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(BODY_SEPARATOR)
}
