use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{Expr, ExprLocation, ExprNode, InitError};
use crate::object::Object;
use crate::stats::{Counter, StatsKey};
use crate::template::LogTemplate;

const TEMPLATE_EVALS_TOTAL: &str = "template_evals_total";

/// Expression wrapping a compiled template. Evaluation renders the template
/// against the context's message batch and yields the result as a borrowed
/// message value, typed by what the formatter reported.
pub struct TemplateExpr {
    template: LogTemplate,
    location: Option<ExprLocation>,
    eval_count: Counter,
}

impl TemplateExpr {
    pub fn new(template: LogTemplate) -> Self {
        Self {
            template,
            location: None,
            eval_count: Counter::default(),
        }
    }

    pub fn boxed(template: LogTemplate) -> ExprNode {
        Box::new(Self::new(template))
    }

    fn stats_key(&self) -> StatsKey {
        StatsKey::new(TEMPLATE_EVALS_TOTAL)
    }
}

impl Expr for TemplateExpr {
    fn name(&self) -> &'static str {
        "template"
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.eval_count = cfg.register_counter(self.stats_key());
        Ok(())
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        cfg.unregister_counter(&self.stats_key(), &mut self.eval_count);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        let mut buf = String::new();
        let vtype = self
            .template
            .format(ctx.msgs(), &ctx.template_options, &mut buf);
        let text = ctx.scratch(buf);
        Ok(Object::message_borrowed(text, vtype))
    }

    fn eval_counter(&self) -> Counter {
        self.eval_count.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::LogMessage;
    use crate::object::ValueType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_template_eval_renders_message_value() {
        let template = LogTemplate::compile("host=${HOST}").unwrap();
        let expr = TemplateExpr::boxed(template);

        let msgs = [LogMessage::with_values([("HOST", "web1")])];
        let mut ctx = EvalContext::new(&msgs);
        let value = expr.eval(&mut ctx).unwrap();

        assert_eq!(value.as_str(), Some("host=web1"));
        assert_eq!(value.value_type(), ValueType::String);
        assert!(value.truthy());
    }

    #[test]
    fn test_missing_value_substitution() {
        let template = LogTemplate::compile("${MISSING}").unwrap();
        let expr = TemplateExpr::boxed(template);

        let msgs = [LogMessage::new()];
        let mut ctx = EvalContext::new(&msgs);
        ctx.template_options.missing_value = "-".to_string();
        let value = expr.eval(&mut ctx).unwrap();
        assert_eq!(value.as_str(), Some("-"));
    }
}
