use regex::Regex;

use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{evaluate, optimize_in_place, Expr, ExprLocation, ExprNode, InitError};
use crate::eval::func::{ConstructError, FunctionArgs, FunctionScaffold};
use crate::eval::generator::{eval_generator, ContainerKind, FillableRef, GeneratorExpr};
use crate::object::Object;
use crate::stats::Counter;

pub const REGEXP_SEARCH_USAGE: &str =
    "Usage: regexp_search(string, pattern, keep_grp_zero=(boolean), list_mode=(boolean))";

/// Generator function matching a compiled pattern against the formatted
/// left-hand side and filling the container with the capture groups.
pub struct RegexpSearchGenerator {
    scaffold: FunctionScaffold,
    lhs: ExprNode,
    pattern: Regex,
    keep_grp_zero: bool,
    list_mode: bool,
    fillable: FillableRef,
}

impl RegexpSearchGenerator {
    pub fn new(mut args: FunctionArgs) -> Result<Self, ConstructError> {
        let usage = args.usage();

        let keep_grp_zero = args.get_named_literal_bool("keep_grp_zero")?.unwrap_or(false);
        let list_mode = args.get_named_literal_bool("list_mode")?.unwrap_or(false);

        if args.len() != 2 {
            return Err(ConstructError::InvalidArity { usage });
        }
        let lhs = args
            .get_expr(0)
            .ok_or(ConstructError::InvalidArity { usage })?;
        let pattern = args
            .get_literal_string(1)
            .ok_or(ConstructError::LiteralStringRequired {
                what: "pattern",
                usage,
            })?;
        let pattern =
            Regex::new(&pattern).map_err(|source| ConstructError::PatternCompile { usage, source })?;
        args.check()?;

        Ok(Self {
            scaffold: FunctionScaffold::new("regexp_search"),
            lhs,
            pattern,
            keep_grp_zero,
            list_mode,
            fillable: FillableRef::new(),
        })
    }

    /// Generator bound to a fresh root container, ready for value position.
    pub fn boxed(args: FunctionArgs) -> Result<ExprNode, ConstructError> {
        let generator = Self::new(args)?;
        crate::eval::generator::bind_root_container(&generator);
        Ok(Box::new(generator))
    }

    fn format_subject(&self, ctx: &mut EvalContext<'_>) -> EvalResult<String> {
        let value = evaluate(self.lhs.as_ref(), ctx)?;
        let mut buf = String::new();
        if !value.repr(&mut buf) {
            return Err(ctx.fail(
                "failed to extract string value, repr() failed",
                self.scaffold.location(),
                Some(&value),
            ));
        }
        Ok(buf)
    }

    fn keeps_group(&self, index: usize, num_groups: usize) -> bool {
        index != 0 || num_groups == 1 || self.keep_grp_zero
    }

    fn store_matches_to_list(
        &self,
        ctx: &mut EvalContext<'_>,
        caps: &regex::Captures<'_>,
        fillable: &Object,
    ) -> EvalResult<()> {
        let num_groups = caps.len();
        for i in 0..num_groups {
            if !self.keeps_group(i, num_groups) {
                continue;
            }
            let Some(group) = caps.get(i) else {
                continue;
            };
            if let Err(err) = fillable.set_subscript(None, Object::from(group.as_str())) {
                return Err(ctx.fail(
                    format!("failed to append regexp match to list: {err}"),
                    self.scaffold.location(),
                    None,
                ));
            }
        }
        Ok(())
    }

    /// Two passes over the capture set: numeric keys first, then named
    /// groups replace their numeric entry under the group name.
    fn store_matches_to_dict(
        &self,
        ctx: &mut EvalContext<'_>,
        caps: &regex::Captures<'_>,
        fillable: &Object,
    ) -> EvalResult<()> {
        let num_groups = caps.len();
        for i in 0..num_groups {
            if !self.keeps_group(i, num_groups) {
                continue;
            }
            let Some(group) = caps.get(i) else {
                continue;
            };
            let key = Object::from(i.to_string());
            if let Err(err) = fillable.set_subscript(Some(&key), Object::from(group.as_str())) {
                return Err(ctx.fail(
                    format!("failed to add regexp match to dict: {err}"),
                    self.scaffold.location(),
                    None,
                ));
            }
        }

        for (index, name) in self.pattern.capture_names().enumerate() {
            let Some(name) = name else {
                continue;
            };
            if caps.get(index).is_none() {
                continue;
            }
            let num_key = Object::from(index.to_string());
            let stored = match fillable.get_subscript(&num_key) {
                Ok(stored) => stored,
                Err(err) => {
                    return Err(ctx.fail(
                        format!("failed to add regexp match to dict: {err}"),
                        self.scaffold.location(),
                        None,
                    ))
                }
            };
            if let Err(err) = fillable
                .set_subscript(Some(&Object::from(name)), stored)
                .and_then(|_| fillable.unset_key(&num_key))
            {
                return Err(ctx.fail(
                    format!("failed to add regexp match to dict: {err}"),
                    self.scaffold.location(),
                    None,
                ));
            }
        }
        Ok(())
    }
}

impl Expr for RegexpSearchGenerator {
    fn name(&self) -> &'static str {
        "regexp_search"
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.scaffold.location()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.scaffold.set_location(location);
    }

    fn ignore_falsy_result(&self) -> bool {
        true
    }

    fn optimize(&mut self) -> Option<ExprNode> {
        optimize_in_place(&mut self.lhs);
        self.fillable.optimize();
        None
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.lhs.init(cfg)?;
        if let Err(err) = self.fillable.init(cfg) {
            self.lhs.deinit(cfg);
            return Err(err);
        }
        if let Err(err) = self.scaffold.init(cfg) {
            self.fillable.deinit(cfg);
            self.lhs.deinit(cfg);
            return Err(err);
        }
        Ok(())
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        self.scaffold.deinit(cfg);
        self.fillable.deinit(cfg);
        self.lhs.deinit(cfg);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        eval_generator(self, ctx)
    }

    fn eval_counter(&self) -> Counter {
        self.scaffold.eval_counter()
    }
}

impl GeneratorExpr for RegexpSearchGenerator {
    fn generate(&self, ctx: &mut EvalContext<'_>, fillable: &Object) -> EvalResult<()> {
        let subject = self.format_subject(ctx)?;

        let Some(caps) = self.pattern.captures(&subject) else {
            return Ok(());
        };

        if fillable.is_list() {
            self.store_matches_to_list(ctx, &caps, fillable)
        } else {
            self.store_matches_to_dict(ctx, &caps, fillable)
        }
    }

    fn container_kind(&self) -> ContainerKind {
        if self.list_mode {
            ContainerKind::List
        } else {
            ContainerKind::Dict
        }
    }

    fn fillable(&self) -> &FillableRef {
        &self.fillable
    }
}
