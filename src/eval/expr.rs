use thiserror::Error;

use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::literal_generator::LiteralGeneratorView;
use crate::object::Object;
use crate::stats::Counter;

/// Owned handle to an expression node. Parents own their children; the tree
/// is torn down by Drop.
pub type ExprNode = Box<dyn Expr>;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to initialize {name} expression: {reason}")]
    Failed { name: &'static str, reason: String },
}

impl InitError {
    pub fn new(name: &'static str, reason: impl Into<String>) -> Self {
        InitError::Failed {
            name,
            reason: reason.into(),
        }
    }
}

/// Where a node came from in the configuration source. The source text is
/// captured only when the runtime runs with `Settings.debug` enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub text: Option<String>,
}

impl ExprLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            text: None,
        }
    }

    pub fn with_text(file: impl Into<String>, line: u32, column: u32, text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::new(file, line, column)
        }
    }

    pub fn format_tag(&self) -> String {
        format!(
            "{}:{}:{}| {}",
            self.file,
            self.line,
            self.column,
            self.text.as_deref().unwrap_or("n/a")
        )
    }

    pub fn format_opt(location: Option<&ExprLocation>) -> String {
        location
            .map(ExprLocation::format_tag)
            .unwrap_or_else(|| "n/a".to_string())
    }
}

/// The universal expression node contract. Lifecycle order is
/// `optimize -> init -> eval* -> deinit`, then Drop releases owned
/// sub-expressions and node-local resources.
pub trait Expr {
    /// Human readable node kind, used in diagnostics and telemetry labels.
    fn name(&self) -> &'static str;

    /// Runtime evaluation. Failure means a diagnostic was pushed on the
    /// context accumulator and no value was produced.
    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult;

    fn location(&self) -> Option<&ExprLocation> {
        None
    }

    fn set_location(&mut self, _location: ExprLocation) {}

    /// Compile-time rewrite pass, invoked once before `init`. Returning a
    /// replacement substitutes this node; `None` means children were
    /// optimized in place.
    fn optimize(&mut self) -> Option<ExprNode> {
        None
    }

    /// Prepares runtime resources (counter registrations). Must be called at
    /// most once before `deinit`; on failure the node is left uninitialized.
    fn init(&mut self, _cfg: &GlobalConfig) -> Result<(), InitError> {
        Ok(())
    }

    /// Mirror of `init`, safe to call once per successful `init`.
    fn deinit(&mut self, _cfg: &GlobalConfig) {}

    /// Whether a falsy result from this node is still a success for the
    /// enclosing compound (generators set this).
    fn ignore_falsy_result(&self) -> bool {
        false
    }

    /// Suppresses this node from per-step trace records.
    fn suppress_from_trace(&self) -> bool {
        false
    }

    /// The node's evaluation counter handle; dormant unless `init`
    /// registered one.
    fn eval_counter(&self) -> Counter {
        Counter::default()
    }

    /// The constant value of a literal node, without evaluating.
    fn as_literal(&self) -> Option<&Object> {
        None
    }

    /// Introspection over a literal list/dict generator's elements, without
    /// evaluating them. Dispatches transparently for top-level and inner
    /// generators.
    fn literal_generator(&self) -> Option<LiteralGeneratorView<'_>> {
        None
    }
}

/// Formats a node's location for diagnostics:
/// `"<file>:<line>:<col>| <source-text-or-'n/a'>"`.
pub fn format_location_tag(expr: &dyn Expr) -> String {
    ExprLocation::format_opt(expr.location())
}

/// Evaluation entry point used by the pipeline driver and by every parent
/// node: bumps the node's counter on success.
pub fn evaluate(expr: &dyn Expr, ctx: &mut EvalContext<'_>) -> EvalResult {
    let result = expr.eval(ctx);
    if result.is_ok() {
        expr.eval_counter().inc();
    }
    result
}

/// Applies `optimize` to a child slot, substituting the replacement node
/// when one is produced.
pub fn optimize_in_place(node: &mut ExprNode) {
    if let Some(replacement) = node.optimize() {
        *node = replacement;
    }
}

/// Initializes `children` in order. If child `k` fails, children `0..k` are
/// deinitialized before the failure is reported, so no partial registrations
/// leak.
pub fn init_children(children: &mut [ExprNode], cfg: &GlobalConfig) -> Result<(), InitError> {
    for i in 0..children.len() {
        if let Err(err) = children[i].init(cfg) {
            for child in &mut children[..i] {
                child.deinit(cfg);
            }
            return Err(err);
        }
    }
    Ok(())
}

pub fn deinit_children(children: &mut [ExprNode], cfg: &GlobalConfig) {
    for child in children {
        child.deinit(cfg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_location_tag_format() {
        let location = ExprLocation::with_text("etc/filter.conf", 12, 3, "$HOST == \"web1\"");
        assert_eq!(
            location.format_tag(),
            "etc/filter.conf:12:3| $HOST == \"web1\""
        );

        let bare = ExprLocation::new("etc/filter.conf", 1, 1);
        assert_eq!(bare.format_tag(), "etc/filter.conf:1:1| n/a");
        assert_eq!(ExprLocation::format_opt(None), "n/a");
    }
}
