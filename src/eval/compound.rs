use tracing::{debug, trace};

use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalFailed, EvalResult};
use crate::eval::expr::{
    deinit_children, evaluate, format_location_tag, init_children, optimize_in_place, Expr,
    ExprLocation, ExprNode, InitError,
};
use crate::object::Object;
use crate::stats::{Counter, StatsKey};

const COMPOUND_EVALS_TOTAL: &str = "compound_evals_total";

/// Ordered statement list with falsy short-circuiting. With
/// `return_value_of_last_expr` unset this is a statement block that always
/// yields an implicit `true`; set, it yields the last statement's value.
pub struct CompoundExpr {
    return_value_of_last_expr: bool,
    exprs: Vec<ExprNode>,
    location: Option<ExprLocation>,
    eval_count: Counter,
}

impl CompoundExpr {
    pub fn new(return_value_of_last_expr: bool) -> Self {
        Self {
            return_value_of_last_expr,
            exprs: Vec::new(),
            location: None,
            eval_count: Counter::default(),
        }
    }

    pub fn add(&mut self, expr: ExprNode) {
        self.exprs.push(expr);
    }

    pub fn add_all(&mut self, exprs: impl IntoIterator<Item = ExprNode>) {
        self.exprs.extend(exprs);
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Evaluates one statement. Failure means no value; a present value with
    /// `false` means the run must bail out on this falsy result.
    fn eval_expr(
        expr: &dyn Expr,
        ctx: &mut EvalContext<'_>,
    ) -> Result<(Object, bool), EvalFailed> {
        let value = evaluate(expr, ctx)?;
        let success = expr.ignore_falsy_result() || value.truthy();

        if ((!success && ctx.debug) || ctx.trace) && !expr.suppress_from_trace() {
            let mut buf = String::new();
            if !value.repr(&mut buf) {
                value.marshal(&mut buf);
            }
            if !success {
                debug!(
                    expr = %format_location_tag(expr),
                    value = %buf,
                    value_type = value.type_name(),
                    "FILTERX FALSY"
                );
            } else {
                trace!(
                    expr = %format_location_tag(expr),
                    value = %buf,
                    truthy = value.truthy(),
                    value_type = value.type_name(),
                    "FILTERX ESTEP"
                );
            }
        }

        Ok((value, success))
    }

    /// Runs the statement list. `Ok` carries the last produced value when
    /// the list ran through (None on early modifier stop or an empty list);
    /// `Err` carries the falsy value the run bailed out on, if one was
    /// produced.
    fn eval_exprs(&self, ctx: &mut EvalContext<'_>) -> Result<Option<Object>, Option<Object>> {
        let mut result = None;

        for expr in &self.exprs {
            // release the previous statement's value
            result = None;

            if ctx.control.terminates() {
                // code flow modifier detected, short circuiting
                return Ok(result);
            }

            let (value, success) = Self::eval_expr(expr.as_ref(), ctx).map_err(|_| None)?;
            if !success {
                return Err(Some(value));
            }
            result = Some(value);
        }

        Ok(result)
    }
}

impl Expr for CompoundExpr {
    fn name(&self) -> &'static str {
        "compound"
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        match self.eval_exprs(ctx) {
            Ok(result) => match result {
                Some(value) if self.return_value_of_last_expr => Ok(value),
                // an empty list of statements, or a compound statement where
                // the result is ignored: implicitly true
                _ => Ok(Object::Boolean(true)),
            },
            Err(falsy) => {
                if let Some(value) = falsy {
                    ctx.fail(
                        "bailing out due to a falsy expr",
                        self.location.as_ref(),
                        Some(&value),
                    );
                }
                Err(EvalFailed)
            }
        }
    }

    fn optimize(&mut self) -> Option<ExprNode> {
        for expr in &mut self.exprs {
            optimize_in_place(expr);
        }
        None
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        init_children(&mut self.exprs, cfg)?;
        self.eval_count = cfg.register_counter(StatsKey::new(COMPOUND_EVALS_TOTAL));
        Ok(())
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        cfg.unregister_counter(&StatsKey::new(COMPOUND_EVALS_TOTAL), &mut self.eval_count);
        deinit_children(&mut self.exprs, cfg);
    }

    fn eval_counter(&self) -> Counter {
        self.eval_count.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::literal::LiteralExpr;
    use crate::message::LogMessage;
    use pretty_assertions::assert_eq;

    fn eval_compound(compound: &CompoundExpr) -> EvalResult {
        let msgs: [LogMessage; 0] = [];
        let mut ctx = EvalContext::new(&msgs);
        compound.eval(&mut ctx)
    }

    #[test]
    fn test_empty_compound_is_true() {
        let compound = CompoundExpr::new(false);
        assert_eq!(eval_compound(&compound), Ok(Object::Boolean(true)));
    }

    #[test]
    fn test_statement_block_ignores_last_value() {
        let mut compound = CompoundExpr::new(false);
        compound.add(LiteralExpr::boxed(Object::from(5)));
        assert_eq!(eval_compound(&compound), Ok(Object::Boolean(true)));
    }

    #[test]
    fn test_expression_sequence_returns_last_value() {
        let mut compound = CompoundExpr::new(true);
        compound.add(LiteralExpr::boxed(Object::from(true)));
        compound.add(LiteralExpr::boxed(Object::from(5)));
        assert_eq!(eval_compound(&compound), Ok(Object::from(5)));
    }

    #[test]
    fn test_falsy_statement_bails_out() {
        let mut compound = CompoundExpr::new(false);
        compound.add(LiteralExpr::boxed(Object::from(false)));

        let msgs: [LogMessage; 0] = [];
        let mut ctx = EvalContext::new(&msgs);
        assert_eq!(compound.eval(&mut ctx), Err(EvalFailed));
        assert_eq!(
            ctx.last_error().unwrap().message,
            "bailing out due to a falsy expr"
        );
    }
}
