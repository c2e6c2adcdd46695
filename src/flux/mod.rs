//! Script model: parsed tree, body tree, structural edits and results.
//!
//! ```text
//!   script text ──[remote parser]──▶ Program (ast)
//!                                       │
//!                                       ▼ body_nodes(ast, suggestions)
//!                                   Vec<Body>
//!                                       │
//!                                       ▼ builder::* (structural edit)
//!                                   new script text ──▶ parse again
//! ```
//!
//! Nothing here talks to a service; the [`crate::sync`] engine owns the
//! round trip.

pub mod ast;
pub mod body;
pub mod builder;
pub mod status;
pub mod suggestion;
pub mod table;

pub use ast::Program;
pub use body::{body_nodes, body_to_script, Arg, Body, BodyKind, Declaration, Func, FuncKind};
pub use builder::{DeleteFuncNodeArgs, InputArg, NEW_FROM, NEW_JOIN};
pub use status::ScriptStatus;
pub use suggestion::{ArgType, Suggestion};
pub use table::{FluxTable, TimeSeriesResult};
