use crate::eval::context::{ControlModifier, EvalContext, EvalResult};
use crate::eval::expr::{Expr, ExprLocation, ExprNode};
use crate::object::Object;

/// `done;` stops evaluating the remaining statements of the enclosing
/// compound and lets the message pass through.
pub struct DoneExpr {
    location: Option<ExprLocation>,
}

impl DoneExpr {
    pub fn boxed() -> ExprNode {
        Box::new(Self { location: None })
    }
}

impl Expr for DoneExpr {
    fn name(&self) -> &'static str {
        "done"
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        ctx.control = ControlModifier::Done;
        Ok(Object::Boolean(true))
    }
}

/// `drop;` stops evaluating and marks the message to be dropped.
pub struct DropExpr {
    location: Option<ExprLocation>,
}

impl DropExpr {
    pub fn boxed() -> ExprNode {
        Box::new(Self { location: None })
    }
}

impl Expr for DropExpr {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        ctx.control = ControlModifier::Drop;
        Ok(Object::Boolean(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::LogMessage;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_done_sets_modifier() {
        let msgs: [LogMessage; 0] = [];
        let mut ctx = EvalContext::new(&msgs);
        let expr = DoneExpr::boxed();

        assert_eq!(expr.eval(&mut ctx), Ok(Object::Boolean(true)));
        assert_eq!(ctx.control, ControlModifier::Done);
    }

    #[test]
    fn test_drop_sets_modifier() {
        let msgs: [LogMessage; 0] = [];
        let mut ctx = EvalContext::new(&msgs);
        let expr = DropExpr::boxed();

        assert_eq!(expr.eval(&mut ctx), Ok(Object::Boolean(true)));
        assert_eq!(ctx.control, ControlModifier::Drop);
    }
}
