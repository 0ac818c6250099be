use thiserror::Error;

use crate::config::GlobalConfig;
use crate::eval::expr::{ExprLocation, ExprNode, InitError};
use crate::object::Object;
use crate::stats::{Counter, StatsKey};

const FUNC_EVALS_TOTAL: &str = "func_evals_total";

/// Construction-time failures: malformed argument lists, a non-literal where
/// a constant is required, pattern compile errors. These keep the node out
/// of the tree entirely, as opposed to evaluation failures which are local
/// to one message.
#[derive(Debug, Error)]
pub enum ConstructError {
    #[error("invalid number of arguments. {usage}")]
    InvalidArity { usage: &'static str },
    #[error("{what} must be a string literal. {usage}")]
    LiteralStringRequired {
        what: &'static str,
        usage: &'static str,
    },
    #[error("{name} argument must be a boolean literal. {usage}")]
    LiteralBoolRequired { name: &'static str, usage: &'static str },
    #[error("unexpected argument {name:?}. {usage}")]
    UnexpectedArgument { name: String, usage: &'static str },
    #[error("failed to compile pattern. {usage}")]
    PatternCompile {
        usage: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("{0}")]
    Other(String),
}

/// One argument of a function invocation, the way the parser hands them
/// over: positional or `name=value`.
pub enum Arg {
    Positional(ExprNode),
    Named { name: String, value: ExprNode },
}

impl Arg {
    pub fn named(name: impl Into<String>, value: ExprNode) -> Self {
        Arg::Named {
            name: name.into(),
            value,
        }
    }
}

/// Argument list a function constructor consumes during shape validation.
/// Accessors take ownership of the slots they bind; [`FunctionArgs::check`]
/// rejects anything left unconsumed.
pub struct FunctionArgs {
    positional: Vec<Option<ExprNode>>,
    named: Vec<(String, Option<ExprNode>)>,
    usage: &'static str,
}

impl FunctionArgs {
    pub fn new(args: Vec<Arg>, usage: &'static str) -> Self {
        let mut positional = Vec::new();
        let mut named = Vec::new();
        for arg in args {
            match arg {
                Arg::Positional(expr) => positional.push(Some(expr)),
                Arg::Named { name, value } => named.push((name, Some(value))),
            }
        }
        Self {
            positional,
            named,
            usage,
        }
    }

    pub fn usage(&self) -> &'static str {
        self.usage
    }

    /// Number of positional arguments (consumed or not).
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn get_expr(&mut self, index: usize) -> Option<ExprNode> {
        self.positional.get_mut(index).and_then(Option::take)
    }

    /// Takes positional argument `index` when it is a compile-time string
    /// literal; a missing or non-literal argument is left in place.
    pub fn get_literal_string(&mut self, index: usize) -> Option<String> {
        let slot = self.positional.get_mut(index)?;
        let is_string_literal = slot
            .as_deref()
            .and_then(|expr| expr.as_literal())
            .and_then(|value| value.as_str())
            .is_some();
        if !is_string_literal {
            return None;
        }
        let expr = slot.take()?;
        expr.as_literal()
            .and_then(|value| value.as_str())
            .map(str::to_string)
    }

    pub fn get_named_expr(&mut self, name: &str) -> Option<ExprNode> {
        self.named
            .iter_mut()
            .find(|(n, slot)| n == name && slot.is_some())
            .and_then(|(_, slot)| slot.take())
    }

    /// Binds an optional named boolean literal. Absent → `Ok(None)`; present
    /// but not a boolean literal → construction error.
    pub fn get_named_literal_bool(
        &mut self,
        name: &'static str,
    ) -> Result<Option<bool>, ConstructError> {
        let Some(expr) = self.get_named_expr(name) else {
            return Ok(None);
        };
        match expr.as_literal() {
            Some(Object::Boolean(b)) => Ok(Some(*b)),
            _ => Err(ConstructError::LiteralBoolRequired {
                name,
                usage: self.usage,
            }),
        }
    }

    /// Final shape check: every argument must have been consumed.
    pub fn check(self) -> Result<(), ConstructError> {
        if let Some((name, _)) = self.named.iter().find(|(_, slot)| slot.is_some()) {
            return Err(ConstructError::UnexpectedArgument {
                name: name.clone(),
                usage: self.usage,
            });
        }
        if self.positional.iter().any(Option::is_some) {
            return Err(ConstructError::InvalidArity { usage: self.usage });
        }
        Ok(())
    }
}

/// Scaffolding embedded by named built-in functions: the function name used
/// as telemetry label and diagnostics prefix, plus the per-function counter.
pub struct FunctionScaffold {
    pub name: &'static str,
    location: Option<ExprLocation>,
    eval_count: Counter,
}

impl FunctionScaffold {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            location: None,
            eval_count: Counter::default(),
        }
    }

    fn stats_key(&self) -> StatsKey {
        StatsKey::with_label(FUNC_EVALS_TOTAL, "name", self.name)
    }

    pub fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.eval_count = cfg.register_counter(self.stats_key());
        Ok(())
    }

    pub fn deinit(&mut self, cfg: &GlobalConfig) {
        cfg.unregister_counter(&self.stats_key(), &mut self.eval_count);
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
