//! Expression evaluation core.
//!
//! Filter and rewrite programs are compiled into a tree of [`expr::Expr`]
//! nodes that is optimized once, initialized against a [`crate::config::GlobalConfig`]
//! and then evaluated repeatedly, one pass per message batch.
//!
//! # Core Components
//!
//! ## Node lifecycle
//! [`expr`] defines the node trait and the lifecycle helpers: `optimize`
//! folds what can be folded at compile time, `init` registers telemetry
//! counters and compiles cached state, `eval` runs against an
//! [`context::EvalContext`], `deinit` releases what `init` acquired.
//!
//! ## Statement sequencing
//! [`compound`] evaluates statement blocks with falsy short-circuiting;
//! [`control`] provides the `done`/`drop` verdict statements the block
//! reacts to.
//!
//! ## Generators
//! [`generator`] is the protocol for expressions that fill a container
//! instead of returning a scalar; [`literal_generator`] implements literal
//! list/dict bodies and [`regexp_search`] populates a container from regex
//! capture groups.
//!
//! ## Functions
//! [`func`] carries the argument-binding layer; [`affix`] implements the
//! string matching functions built on it.

pub mod affix;
pub mod coalesce;
pub mod compound;
pub mod context;
pub mod control;
pub mod expr;
pub mod func;
pub mod generator;
pub mod literal;
pub mod literal_generator;
pub mod op;
pub mod regexp_search;
pub mod template_expr;

pub use compound::CompoundExpr;
pub use context::{ControlModifier, EvalContext, EvalDiag, EvalFailed, EvalResult};
pub use expr::{evaluate, Expr, ExprLocation, ExprNode, InitError};
pub use literal::LiteralExpr;
