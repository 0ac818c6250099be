use std::rc::Rc;

use thiserror::Error;

use crate::config::Settings;
use crate::eval::expr::ExprLocation;
use crate::message::LogMessage;
use crate::object::Object;
use crate::template::TemplateEvalOptions;

/// Control-flow signal observed by the compound evaluator. Once set to
/// `Drop` or `Done` it stays set for the remainder of the pass; the compound
/// only reacts to it, it never clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ControlModifier {
    #[default]
    None,
    Drop,
    Done,
}

impl ControlModifier {
    pub fn terminates(&self) -> bool {
        matches!(self, ControlModifier::Drop | ControlModifier::Done)
    }
}

/// Marker error for a failed evaluation. The diagnostic detail lives on the
/// context's accumulator; callers check the result and decide whether to
/// propagate or substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expression evaluation failed")]
pub struct EvalFailed;

pub type EvalResult<T = Object> = Result<T, EvalFailed>;

/// One reported evaluation failure: a message with the offending node's
/// location and the offending value attached.
#[derive(Debug, Clone)]
pub struct EvalDiag {
    pub message: String,
    pub location: Option<ExprLocation>,
    pub value: Option<Object>,
    pub info: Option<String>,
}

impl EvalDiag {
    /// Renders `"<message>: <info-or-value-repr>"` for log records.
    pub fn format_tag(&self) -> String {
        let extra = self.info.clone().or_else(|| {
            self.value.as_ref().map(|value| {
                let mut buf = String::new();
                value.repr(&mut buf);
                buf
            })
        });
        match extra {
            Some(extra) if !extra.is_empty() => format!("{}: {}", self.message, extra),
            _ => self.message.clone(),
        }
    }

    pub fn format_location_tag(&self) -> String {
        ExprLocation::format_opt(self.location.as_ref())
    }
}

/// Per-pass evaluation state threaded through every `eval` call: the record
/// batch under evaluation, the control-flow modifier, template formatting
/// options and the diagnostic accumulator.
pub struct EvalContext<'a> {
    msgs: &'a [LogMessage],
    pub control: ControlModifier,
    pub template_options: TemplateEvalOptions,
    pub debug: bool,
    pub trace: bool,
    errors: Vec<EvalDiag>,
    scratch: Vec<Rc<str>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(msgs: &'a [LogMessage]) -> Self {
        Self {
            msgs,
            control: ControlModifier::None,
            template_options: TemplateEvalOptions::default(),
            debug: false,
            trace: false,
            errors: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn with_settings(msgs: &'a [LogMessage], settings: &Settings) -> Self {
        let mut ctx = Self::new(msgs);
        ctx.debug = settings.debug;
        ctx.trace = settings.trace;
        ctx
    }

    pub fn msgs(&self) -> &'a [LogMessage] {
        self.msgs
    }

    /// Pushes a diagnostic and returns the failure marker, so failure sites
    /// read `return Err(ctx.fail(...))`.
    pub fn fail(
        &mut self,
        message: impl Into<String>,
        location: Option<&ExprLocation>,
        value: Option<&Object>,
    ) -> EvalFailed {
        self.errors.push(EvalDiag {
            message: message.into(),
            location: location.cloned(),
            value: value.cloned(),
            info: None,
        });
        EvalFailed
    }

    pub fn fail_with_info(
        &mut self,
        message: impl Into<String>,
        location: Option<&ExprLocation>,
        info: impl Into<String>,
    ) -> EvalFailed {
        self.errors.push(EvalDiag {
            message: message.into(),
            location: location.cloned(),
            value: None,
            info: Some(info.into()),
        });
        EvalFailed
    }

    pub fn errors(&self) -> &[EvalDiag] {
        &self.errors
    }

    pub fn last_error(&self) -> Option<&EvalDiag> {
        self.errors.last()
    }

    /// Clears the accumulated diagnostics; used by operators that absorb a
    /// failed operand (e.g. null coalescing).
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Allocates a pass-scoped buffer for a formatted value. The returned
    /// handle shares the storage; the arena keeps it alive until the context
    /// is torn down.
    pub fn scratch(&mut self, text: String) -> Rc<str> {
        let buf: Rc<str> = Rc::from(text.as_str());
        self.scratch.push(buf.clone());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fail_accumulates_diagnostics() {
        let msgs: [LogMessage; 0] = [];
        let mut ctx = EvalContext::new(&msgs);

        let err = ctx.fail("bad value", None, Some(&Object::from("oops")));
        assert_eq!(err, EvalFailed);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.last_error().unwrap().format_tag(), "bad value: oops");

        ctx.clear_errors();
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_modifier_default_and_terminates() {
        let msgs: [LogMessage; 0] = [];
        let ctx = EvalContext::new(&msgs);
        assert_eq!(ctx.control, ControlModifier::None);
        assert!(!ctx.control.terminates());
        assert!(ControlModifier::Drop.terminates());
        assert!(ControlModifier::Done.terminates());
    }

    #[test]
    fn test_scratch_outlives_formatting() {
        let msgs: [LogMessage; 0] = [];
        let mut ctx = EvalContext::new(&msgs);
        let buf = ctx.scratch("formatted".to_string());
        assert_eq!(&*buf, "formatted");
    }
}
