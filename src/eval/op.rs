use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{optimize_in_place, Expr, ExprLocation, ExprNode, InitError};
use crate::object::Object;
use crate::stats::{Counter, StatsKey};

const OP_EVALS_TOTAL: &str = "op_evals_total";

/// Shared scaffolding for single-operand operators: owns the operand, the
/// operator name used as the telemetry label, and the per-operator counter.
/// Concrete operators embed this and delegate the lifecycle methods to it.
pub struct UnaryOp {
    pub name: &'static str,
    pub operand: ExprNode,
    location: Option<ExprLocation>,
    eval_count: Counter,
}

impl UnaryOp {
    pub fn new(name: &'static str, operand: ExprNode) -> Self {
        Self {
            name,
            operand,
            location: None,
            eval_count: Counter::default(),
        }
    }

    fn stats_key(&self) -> StatsKey {
        StatsKey::with_label(OP_EVALS_TOTAL, "name", self.name)
    }

    pub fn optimize(&mut self) {
        optimize_in_place(&mut self.operand);
    }

    pub fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.operand.init(cfg)?;
        self.eval_count = cfg.register_counter(self.stats_key());
        Ok(())
    }

    pub fn deinit(&mut self, cfg: &GlobalConfig) {
        cfg.unregister_counter(&self.stats_key(), &mut self.eval_count);
        self.operand.deinit(cfg);
    }

    pub fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    pub fn eval_counter(&self) -> Counter {
        self.eval_count.clone()
    }
}

/// Two-operand counterpart of [`UnaryOp`].
pub struct BinaryOp {
    pub name: &'static str,
    pub lhs: ExprNode,
    pub rhs: ExprNode,
    location: Option<ExprLocation>,
    eval_count: Counter,
}

impl BinaryOp {
    pub fn new(name: &'static str, lhs: ExprNode, rhs: ExprNode) -> Self {
        Self {
            name,
            lhs,
            rhs,
            location: None,
            eval_count: Counter::default(),
        }
    }

    fn stats_key(&self) -> StatsKey {
        StatsKey::with_label(OP_EVALS_TOTAL, "name", self.name)
    }

    pub fn optimize(&mut self) {
        optimize_in_place(&mut self.lhs);
        optimize_in_place(&mut self.rhs);
    }

    /// NOTE: when the rhs init fails, the lhs stays initialized; its counter
    /// registration is only released by the owning tree's teardown. This
    /// mirrors the accepted lifetime quirk of the original runtime.
    pub fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.lhs.init(cfg)?;
        self.rhs.init(cfg)?;
        self.eval_count = cfg.register_counter(self.stats_key());
        Ok(())
    }

    pub fn deinit(&mut self, cfg: &GlobalConfig) {
        cfg.unregister_counter(&self.stats_key(), &mut self.eval_count);
        self.lhs.deinit(cfg);
        self.rhs.deinit(cfg);
    }

    pub fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    pub fn eval_counter(&self) -> Counter {
        self.eval_count.clone()
    }
}

/// Boolean negation: the canonical unary operator.
pub struct NotExpr {
    op: UnaryOp,
}

impl NotExpr {
    pub fn new(operand: ExprNode) -> Self {
        Self {
            op: UnaryOp::new("not", operand),
        }
    }

    pub fn boxed(operand: ExprNode) -> ExprNode {
        Box::new(Self::new(operand))
    }
}

impl Expr for NotExpr {
    fn name(&self) -> &'static str {
        self.op.name
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.op.location()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.op.set_location(location);
    }

    fn optimize(&mut self) -> Option<ExprNode> {
        self.op.optimize();
        None
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.op.init(cfg)
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        self.op.deinit(cfg);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        let value = crate::eval::expr::evaluate(self.op.operand.as_ref(), ctx)?;
        Ok(Object::Boolean(!value.truthy()))
    }

    fn eval_counter(&self) -> Counter {
        self.op.eval_counter()
    }
}
