use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{Expr, ExprLocation, ExprNode};
use crate::object::Object;

/// Wraps a constant value produced at parse time.
pub struct LiteralExpr {
    value: Object,
    location: Option<ExprLocation>,
}

impl LiteralExpr {
    pub fn new(value: Object) -> Self {
        Self {
            value,
            location: None,
        }
    }

    pub fn boxed(value: Object) -> ExprNode {
        Box::new(Self::new(value))
    }
}

impl Expr for LiteralExpr {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn eval(&self, _ctx: &mut EvalContext<'_>) -> EvalResult {
        Ok(self.value.clone())
    }

    fn as_literal(&self) -> Option<&Object> {
        Some(&self.value)
    }
}

pub fn is_literal(expr: &dyn Expr) -> bool {
    expr.as_literal().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::LogMessage;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_literal_eval_and_introspection() {
        let expr = LiteralExpr::new(Object::from("payload"));
        assert!(is_literal(&expr));
        assert_eq!(expr.as_literal(), Some(&Object::from("payload")));

        let msgs: [LogMessage; 0] = [];
        let mut ctx = EvalContext::new(&msgs);
        assert_eq!(expr.eval(&mut ctx), Ok(Object::from("payload")));
    }
}
