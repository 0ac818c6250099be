//! # siftx: log filtering and rewriting expression runtime
//!
//! siftx executes compiled filter/rewrite programs against in-flight log
//! message batches. A program is a tree of expression nodes built by an
//! upstream parser; this crate provides the node lifecycle, the evaluation
//! context, the value model and the built-in expression forms.
//!
//! ## Core Components
//!
//! - Expression tree and lifecycle ([`eval`])
//! - Runtime value model ([`object`])
//! - Message batch shim ([`message`])
//! - Legacy template formatting ([`template`])
//! - Telemetry counters ([`stats`])
//! - Configuration ([`config`])
//!
//! ## Evaluation Pipeline
//!
//! ```text
//! Parsed tree → optimize → init → eval (per batch) → deinit
//! ```
//!
//! Each pass evaluates the root compound against an [`eval::EvalContext`]
//! holding the message batch; a falsy statement or an evaluation error
//! stops the pass, and `done`/`drop` verdicts end it early on purpose.

pub mod config;
pub mod error;
pub mod eval;
pub mod message;
pub mod object;
pub mod stats;
pub mod template;

pub use config::{GlobalConfig, Settings};
pub use error::Error;
pub use eval::{
    evaluate, CompoundExpr, ControlModifier, EvalContext, EvalDiag, EvalFailed, EvalResult, Expr,
    ExprLocation, ExprNode, InitError, LiteralExpr,
};
pub use message::LogMessage;
pub use object::{Object, ObjectError, ValueType};
pub use stats::{Counter, StatsKey, StatsRegistry};
pub use template::{LogTemplate, TemplateEvalOptions};
