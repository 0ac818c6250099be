use tracing::debug;

use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{evaluate, Expr, ExprLocation, ExprNode, InitError};
use crate::eval::literal::LiteralExpr;
use crate::eval::op::BinaryOp;
use crate::object::Object;
use crate::stats::Counter;

/// `lhs ?? rhs`: yields lhs unless it fails to evaluate or is null, in which
/// case the accumulated diagnostics are suppressed and rhs is yielded.
pub struct NullCoalesceExpr {
    op: BinaryOp,
}

impl NullCoalesceExpr {
    pub fn new(lhs: ExprNode, rhs: ExprNode) -> Self {
        Self {
            op: BinaryOp::new("null_coalesce", lhs, rhs),
        }
    }

    pub fn boxed(lhs: ExprNode, rhs: ExprNode) -> ExprNode {
        Box::new(Self::new(lhs, rhs))
    }

    fn take_operand(slot: &mut ExprNode) -> ExprNode {
        std::mem::replace(slot, LiteralExpr::boxed(Object::Null))
    }
}

impl Expr for NullCoalesceExpr {
    fn name(&self) -> &'static str {
        self.op.name
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.op.location()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.op.set_location(location);
    }

    /// A literal lhs decides the outcome at compile time: the whole operator
    /// folds to whichever side would be yielded.
    fn optimize(&mut self) -> Option<ExprNode> {
        self.op.optimize();

        let folds_to_rhs = match self.op.lhs.as_literal() {
            Some(value) => value.is_null(),
            None => return None,
        };
        if folds_to_rhs {
            Some(Self::take_operand(&mut self.op.rhs))
        } else {
            Some(Self::take_operand(&mut self.op.lhs))
        }
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.op.init(cfg)
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        self.op.deinit(cfg);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        match evaluate(self.op.lhs.as_ref(), ctx) {
            Ok(value) if !value.is_null() => Ok(value),
            Ok(_) => evaluate(self.op.rhs.as_ref(), ctx),
            Err(_) => {
                if let Some(diag) = ctx.last_error() {
                    debug!(error = %diag.format_tag(), "null coalesce suppressing error");
                }
                ctx.clear_errors();
                evaluate(self.op.rhs.as_ref(), ctx)
            }
        }
    }

    fn eval_counter(&self) -> Counter {
        self.op.eval_counter()
    }
}
