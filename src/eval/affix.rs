use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{evaluate, optimize_in_place, Expr, ExprLocation, ExprNode, InitError};
use crate::eval::func::{ConstructError, FunctionArgs, FunctionScaffold};
use crate::eval::generator::ContainerKind;
use crate::object::Object;
use crate::stats::Counter;

pub const STARTSWITH_USAGE: &str = "Usage: startswith(string, prefix, ignorecase=true) \
or startswith(string, [prefix_1, prefix_2, ..], ignorecase=true)";

pub const ENDSWITH_USAGE: &str = "Usage: endswith(string, suffix, ignorecase=true) \
or endswith(string, [suffix_1, suffix_2, ..], ignorecase=true)";

pub const INCLUDES_USAGE: &str = "Usage: includes(string, substring, ignorecase=true) \
or includes(string, [substring_1, substring_2, ..], ignorecase=true)";

type ProcessFn = fn(haystack: &str, needle: &str) -> bool;

fn startswith_process(haystack: &str, needle: &str) -> bool {
    haystack.as_bytes().starts_with(needle.as_bytes())
}

fn endswith_process(haystack: &str, needle: &str) -> bool {
    haystack.as_bytes().ends_with(needle.as_bytes())
}

fn includes_process(haystack: &str, needle: &str) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.contains(needle)
}

fn format_value(value: &Object, ignore_case: bool) -> Option<String> {
    let mut buf = String::new();
    if !value.repr(&mut buf) {
        return None;
    }
    if ignore_case {
        buf = buf.to_lowercase();
    }
    Some(buf)
}

/// Picture of the needle argument taken at construction. Literal needles
/// are formatted and casefolded once; everything else is deferred to eval.
enum NeedleCache {
    /// Single literal needle, pre-formatted.
    Single(String),
    /// Literal list body: one slot per element, aligned with the
    /// generator's element order. Literal elements are pre-formatted,
    /// `None` slots are formatted per evaluation.
    Elements(Vec<Option<String>>),
    /// Not introspectable at construction; the needle expression is
    /// evaluated on every call.
    Dynamic,
}

/// Common body of `startswith`/`endswith`/`includes`: formats the haystack,
/// then probes it with each needle until one matches.
pub struct AffixExpr {
    scaffold: FunctionScaffold,
    ignore_case: bool,
    haystack: ExprNode,
    needle: ExprNode,
    cache: NeedleCache,
    process: ProcessFn,
}

impl AffixExpr {
    fn new(
        mut args: FunctionArgs,
        name: &'static str,
        process: ProcessFn,
    ) -> Result<Self, ConstructError> {
        let usage = args.usage();

        let ignore_case = args.get_named_literal_bool("ignorecase")?.unwrap_or(false);

        if args.len() < 2 {
            return Err(ConstructError::InvalidArity { usage });
        }
        let haystack = args
            .get_expr(0)
            .ok_or(ConstructError::InvalidArity { usage })?;
        let needle = args
            .get_expr(1)
            .ok_or(ConstructError::InvalidArity { usage })?;
        args.check()?;

        let cache = Self::build_needle_cache(needle.as_ref(), ignore_case)?;

        Ok(Self {
            scaffold: FunctionScaffold::new(name),
            ignore_case,
            haystack,
            needle,
            cache,
            process,
        })
    }

    fn build_needle_cache(
        needle: &dyn Expr,
        ignore_case: bool,
    ) -> Result<NeedleCache, ConstructError> {
        if let Some(value) = needle.as_literal() {
            let formatted = format_value(value, ignore_case)
                .ok_or_else(|| ConstructError::Other("needle caching failed.".to_string()))?;
            return Ok(NeedleCache::Single(formatted));
        }

        if let Some(view) = needle.literal_generator() {
            if view.kind() == ContainerKind::List {
                let mut slots = Vec::with_capacity(view.len());
                for elem in view.iter() {
                    match elem.literal_value() {
                        Some(value) => {
                            let formatted = format_value(value, ignore_case).ok_or_else(|| {
                                ConstructError::Other("needle caching failed.".to_string())
                            })?;
                            slots.push(Some(formatted));
                        }
                        None => slots.push(None),
                    }
                }
                return Ok(NeedleCache::Elements(slots));
            }
        }

        Ok(NeedleCache::Dynamic)
    }

    fn format_expr(&self, expr: &dyn Expr, ctx: &mut EvalContext<'_>) -> EvalResult<String> {
        let value = evaluate(expr, ctx)?;
        format_value(&value, self.ignore_case).ok_or_else(|| {
            ctx.fail(
                "failed to extract string value, repr() failed",
                expr.location(),
                Some(&value),
            )
        })
    }

    /// Needles materialized from a non-literal needle expression: a single
    /// string, or every element of a list.
    fn eval_needles(&self, ctx: &mut EvalContext<'_>) -> EvalResult<Vec<String>> {
        let needle_obj = evaluate(self.needle.as_ref(), ctx)?;

        if needle_obj.is_string() {
            let formatted = format_value(&needle_obj, self.ignore_case).ok_or_else(|| {
                ctx.fail(
                    "failed to extract string value, repr() failed",
                    self.scaffold.location(),
                    Some(&needle_obj),
                )
            })?;
            return Ok(vec![formatted]);
        }

        if needle_obj.is_list() {
            let len = needle_obj.len().unwrap_or(0);
            let mut needles = Vec::with_capacity(len);
            for i in 0..len {
                let elem = needle_obj
                    .get_subscript(&Object::from(i as i64))
                    .map_err(|err| {
                        ctx.fail(
                            format!("failed to read needle element: {err}"),
                            self.scaffold.location(),
                            None,
                        )
                    })?;
                let formatted = format_value(&elem, self.ignore_case).ok_or_else(|| {
                    ctx.fail(
                        "failed to extract string value, repr() failed",
                        self.scaffold.location(),
                        Some(&elem),
                    )
                })?;
                needles.push(formatted);
            }
            return Ok(needles);
        }

        Err(ctx.fail(
            "needle must be a string or a list of strings",
            self.scaffold.location(),
            Some(&needle_obj),
        ))
    }

    fn match_cached_elements(
        &self,
        ctx: &mut EvalContext<'_>,
        haystack: &str,
        slots: &[Option<String>],
    ) -> EvalResult<bool> {
        let Some(view) = self.needle.literal_generator() else {
            let needles = self.eval_needles(ctx)?;
            return Ok(needles
                .iter()
                .any(|needle| (self.process)(haystack, needle)));
        };
        for (elem, slot) in view.iter().zip(slots) {
            let matched = match slot {
                Some(cached) => (self.process)(haystack, cached),
                None => {
                    let formatted = self.format_expr(elem.value_expr(), ctx)?;
                    (self.process)(haystack, &formatted)
                }
            };
            if matched {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Expr for AffixExpr {
    fn name(&self) -> &'static str {
        self.scaffold.name
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.scaffold.location()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.scaffold.set_location(location);
    }

    fn optimize(&mut self) -> Option<ExprNode> {
        optimize_in_place(&mut self.haystack);
        optimize_in_place(&mut self.needle);
        None
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.haystack.init(cfg)?;
        if let Err(err) = self.needle.init(cfg) {
            self.haystack.deinit(cfg);
            return Err(err);
        }
        if let Err(err) = self.scaffold.init(cfg) {
            self.needle.deinit(cfg);
            self.haystack.deinit(cfg);
            return Err(err);
        }
        Ok(())
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        self.scaffold.deinit(cfg);
        self.needle.deinit(cfg);
        self.haystack.deinit(cfg);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        let haystack = self.format_expr(self.haystack.as_ref(), ctx)?;

        let matches = match &self.cache {
            NeedleCache::Single(needle) => (self.process)(&haystack, needle),
            NeedleCache::Elements(slots) => {
                self.match_cached_elements(ctx, &haystack, slots)?
            }
            NeedleCache::Dynamic => {
                let needles = self.eval_needles(ctx)?;
                needles
                    .iter()
                    .any(|needle| (self.process)(&haystack, needle))
            }
        };

        Ok(Object::Boolean(matches))
    }

    fn eval_counter(&self) -> Counter {
        self.scaffold.eval_counter()
    }
}

pub fn startswith_new(args: FunctionArgs) -> Result<ExprNode, ConstructError> {
    Ok(Box::new(AffixExpr::new(
        args,
        "startswith",
        startswith_process,
    )?))
}

pub fn endswith_new(args: FunctionArgs) -> Result<ExprNode, ConstructError> {
    Ok(Box::new(AffixExpr::new(args, "endswith", endswith_process)?))
}

pub fn includes_new(args: FunctionArgs) -> Result<ExprNode, ConstructError> {
    Ok(Box::new(AffixExpr::new(args, "includes", includes_process)?))
}
