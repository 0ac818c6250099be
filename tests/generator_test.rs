use pretty_assertions::assert_eq;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use siftx::eval::func::{Arg, FunctionArgs};
use siftx::eval::generator::{bind_root_container, ContainerKind, GeneratorExpr};
use siftx::eval::literal_generator::{GenElem, InnerLiteralGenerator, LiteralGenerator};
use siftx::eval::regexp_search::{RegexpSearchGenerator, REGEXP_SEARCH_USAGE};
use siftx::{EvalContext, Expr, ExprNode, LiteralExpr, LogMessage, Object};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn lit(value: impl Into<Object>) -> ExprNode {
    LiteralExpr::boxed(value.into())
}

fn eval_root(expr: &dyn Expr) -> Object {
    let msgs = [LogMessage::new()];
    let mut ctx = EvalContext::new(&msgs);
    expr.eval(&mut ctx).expect("generator evaluation failed")
}

#[test]
fn test_literal_dict_round_trip() {
    let gen = LiteralGenerator::boxed(
        ContainerKind::Dict,
        vec![
            GenElem::keyed(lit("program"), lit("sshd")),
            GenElem::keyed(lit("severity"), lit(3)),
        ],
    );

    let result = eval_root(gen.as_ref());
    assert_eq!(
        result.get_subscript(&Object::from("program")),
        Ok(Object::from("sshd"))
    );
    assert_eq!(
        result.get_subscript(&Object::from("severity")),
        Ok(Object::from(3))
    );
    assert_eq!(result.len(), Some(2));
}

#[test]
fn test_each_evaluation_fills_a_fresh_container() {
    let gen = LiteralGenerator::boxed(ContainerKind::List, vec![GenElem::new(lit(1))]);

    let first = eval_root(gen.as_ref());
    let second = eval_root(gen.as_ref());
    assert_eq!(first, second);
    assert!(!first.shares_storage(&second));
}

#[test]
fn test_cloneable_literal_keeps_copies_independent() {
    let shared = Object::list_from(vec![Object::from("seed")]);
    let mut gen = LiteralGenerator::boxed(
        ContainerKind::List,
        vec![GenElem::new(LiteralExpr::boxed(shared.clone()))],
    );
    // the optimize pass flags literal elements as cloneable
    if let Some(replacement) = gen.optimize() {
        gen = replacement;
    }

    let result = eval_root(gen.as_ref());
    let stored = result.get_subscript(&Object::from(0)).unwrap();
    assert_eq!(stored, shared);
    assert!(!stored.shares_storage(&shared));

    stored.set_subscript(None, Object::from("mutated")).unwrap();
    assert_eq!(shared.len(), Some(1));
}

#[test]
fn test_nested_generator_builds_inner_containers() {
    // {"outer": [1, 2, {"inner": 3}]}
    let root = LiteralGenerator::new(ContainerKind::Dict, Vec::new());
    let root_fillable = root.fillable().clone();

    let innermost = InnerLiteralGenerator::boxed(
        ContainerKind::Dict,
        vec![GenElem::keyed(lit("inner"), lit(3))],
        root_fillable.clone(),
    );
    let middle = InnerLiteralGenerator::boxed(
        ContainerKind::List,
        vec![
            GenElem::new(lit(1)),
            GenElem::new(lit(2)),
            GenElem::new(innermost),
        ],
        root_fillable,
    );

    let mut root = root;
    root.add_element(GenElem::keyed(lit("outer"), middle));
    bind_root_container(&root);

    let result = eval_root(&root);
    let outer = result.get_subscript(&Object::from("outer")).unwrap();
    assert!(outer.is_list());
    assert_eq!(outer.len(), Some(3));
    assert_eq!(outer.get_subscript(&Object::from(1)), Ok(Object::from(2)));

    let inner = outer.get_subscript(&Object::from(2)).unwrap();
    assert!(inner.is_dict());
    assert_eq!(
        inner.get_subscript(&Object::from("inner")),
        Ok(Object::from(3))
    );
}

#[test]
fn test_regexp_search_dict_mode() {
    let args = FunctionArgs::new(
        vec![
            Arg::Positional(lit("2024-01-01")),
            Arg::Positional(lit(r"(?P<year>\d{4})-(\d{2})-(\d{2})")),
        ],
        REGEXP_SEARCH_USAGE,
    );
    let expr = RegexpSearchGenerator::boxed(args).unwrap();

    let result = eval_root(expr.as_ref());
    assert!(result.is_dict());
    assert_eq!(result.len(), Some(3));
    assert_eq!(
        result.get_subscript(&Object::from("year")),
        Ok(Object::from("2024"))
    );
    assert_eq!(result.get_subscript(&Object::from("2")), Ok(Object::from("01")));
    assert_eq!(result.get_subscript(&Object::from("3")), Ok(Object::from("01")));
    assert!(result.get_subscript(&Object::from("0")).is_err());
}

#[test]
fn test_regexp_search_list_mode() {
    let args = FunctionArgs::new(
        vec![
            Arg::Positional(lit("2024-01-01")),
            Arg::Positional(lit(r"(\d{4})-(\d{2})-(\d{2})")),
            Arg::named("list_mode", lit(true)),
        ],
        REGEXP_SEARCH_USAGE,
    );
    let expr = RegexpSearchGenerator::boxed(args).unwrap();

    let result = eval_root(expr.as_ref());
    assert_eq!(
        result,
        Object::list_from(vec![
            Object::from("2024"),
            Object::from("01"),
            Object::from("01"),
        ])
    );
}

#[test]
fn test_regexp_search_no_match_is_empty_success() {
    let args = FunctionArgs::new(
        vec![
            Arg::Positional(lit("hello")),
            Arg::Positional(lit(r"(\d+)")),
        ],
        REGEXP_SEARCH_USAGE,
    );
    let expr = RegexpSearchGenerator::boxed(args).unwrap();

    let result = eval_root(expr.as_ref());
    assert!(result.is_dict());
    assert_eq!(result.len(), Some(0));
    assert!(!result.truthy());
    assert!(expr.ignore_falsy_result());
}
