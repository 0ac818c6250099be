use pretty_assertions::assert_eq;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use siftx::config::STATS_LEVEL_DETAIL;
use siftx::eval::coalesce::NullCoalesceExpr;
use siftx::eval::op::NotExpr;
use siftx::stats::StatsKey;
use siftx::{
    CompoundExpr, EvalContext, EvalResult, Expr, ExprNode, GlobalConfig, InitError, LiteralExpr,
    LogMessage, Object, Settings,
};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

struct InitFailExpr;

impl Expr for InitFailExpr {
    fn name(&self) -> &'static str {
        "init_fail"
    }

    fn init(&mut self, _cfg: &GlobalConfig) -> Result<(), InitError> {
        Err(InitError::new("init_fail", "stub refuses to initialize"))
    }

    fn eval(&self, _ctx: &mut EvalContext<'_>) -> EvalResult {
        Ok(Object::Null)
    }
}

fn not_key() -> StatsKey {
    StatsKey::with_label("op_evals_total", "name", "not")
}

#[test]
fn test_compound_init_rolls_back_initialized_children() {
    let cfg = GlobalConfig::default();

    let mut compound = CompoundExpr::new(false);
    compound.add(NotExpr::boxed(LiteralExpr::boxed(Object::from(false))));
    compound.add(Box::new(InitFailExpr));

    assert!(compound.init(&cfg).is_err());

    // the first child registered its counter and the rollback released it;
    // the compound's own counter was never registered
    assert!(!cfg.stats.is_registered(&not_key()));
    assert!(!cfg.stats.is_registered(&StatsKey::new("compound_evals_total")));
    assert_eq!(cfg.stats.len(), 0);
}

#[test]
fn test_binary_op_failed_rhs_leaves_lhs_initialized() {
    let cfg = GlobalConfig::default();

    let mut expr = NullCoalesceExpr::new(
        NotExpr::boxed(LiteralExpr::boxed(Object::from(true))),
        Box::new(InitFailExpr),
    );

    assert!(expr.init(&cfg).is_err());
    assert!(cfg.stats.is_registered(&not_key()));

    // tearing the node down releases the lhs registration exactly once
    expr.deinit(&cfg);
    assert!(!cfg.stats.is_registered(&not_key()));
    assert_eq!(cfg.stats.len(), 0);

    // a second deinit only sees dormant counter handles
    expr.deinit(&cfg);
    assert_eq!(cfg.stats.len(), 0);
}

#[test]
fn test_shared_counter_key_is_use_counted() {
    let cfg = GlobalConfig::default();

    let mut first = NotExpr::new(LiteralExpr::boxed(Object::from(1)));
    let mut second = NotExpr::new(LiteralExpr::boxed(Object::from(2)));
    first.init(&cfg).unwrap();
    second.init(&cfg).unwrap();

    let msgs = [LogMessage::new()];
    let mut ctx = EvalContext::new(&msgs);
    siftx::evaluate(&first, &mut ctx).unwrap();
    siftx::evaluate(&second, &mut ctx).unwrap();
    assert_eq!(cfg.stats.value(&not_key()), Some(2));

    first.deinit(&cfg);
    // the cluster survives while the other node still uses it
    assert!(cfg.stats.is_registered(&not_key()));

    second.deinit(&cfg);
    assert!(!cfg.stats.is_registered(&not_key()));
}

#[test]
fn test_low_stats_level_keeps_counters_dormant() {
    let cfg = GlobalConfig::new(Settings {
        stats_level: STATS_LEVEL_DETAIL - 1,
        ..Settings::default()
    });

    let mut compound = CompoundExpr::new(false);
    compound.add(NotExpr::boxed(LiteralExpr::boxed(Object::from(false))));
    compound.init(&cfg).unwrap();

    assert_eq!(cfg.stats.len(), 0);
    assert!(!compound.eval_counter().is_registered());

    // evaluation itself is unaffected
    let msgs = [LogMessage::new()];
    let mut ctx = EvalContext::new(&msgs);
    assert_eq!(compound.eval(&mut ctx), Ok(Object::Boolean(true)));

    compound.deinit(&cfg);
    assert_eq!(cfg.stats.len(), 0);
}

#[test]
fn test_counter_counts_successful_evals_only() {
    let cfg = GlobalConfig::default();

    let mut compound = CompoundExpr::new(false);
    compound.add(LiteralExpr::boxed(Object::from(false)));
    compound.init(&cfg).unwrap();

    let key = StatsKey::new("compound_evals_total");
    let msgs = [LogMessage::new()];

    let mut ctx = EvalContext::new(&msgs);
    let root: &dyn Expr = &compound;
    assert!(siftx::evaluate(root, &mut ctx).is_err());
    assert_eq!(cfg.stats.value(&key), Some(0));

    compound.deinit(&cfg);
}
