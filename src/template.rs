use thiserror::Error;

use crate::message::{lookup_value, LogMessage};
use crate::object::ValueType;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("unterminated value reference in template {0:?}")]
    UnterminatedRef(String),
    #[error("empty value reference in template {0:?}")]
    EmptyRef(String),
}

/// Formatting options threaded through the evaluation context.
#[derive(Debug, Clone, Default)]
pub struct TemplateEvalOptions {
    /// Substituted for value references the batch cannot resolve.
    pub missing_value: String,
}

#[derive(Debug, Clone, PartialEq)]
enum TemplatePart {
    Literal(String),
    ValueRef(String),
}

/// A pre-compiled formatting template: literal text interleaved with
/// `${name}` record-value references (`$$` escapes a dollar sign). The full
/// template micro-language lives in the formatting layer; this is the subset
/// the expression runtime compiles and formats.
#[derive(Debug, Clone, PartialEq)]
pub struct LogTemplate {
    text: String,
    parts: Vec<TemplatePart>,
}

impl LogTemplate {
    pub fn compile(text: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];
            if let Some(stripped) = rest.strip_prefix('$') {
                literal.push('$');
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix('{') {
                let end = stripped
                    .find('}')
                    .ok_or_else(|| TemplateError::UnterminatedRef(text.to_string()))?;
                if end == 0 {
                    return Err(TemplateError::EmptyRef(text.to_string()));
                }
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                parts.push(TemplatePart::ValueRef(stripped[..end].to_string()));
                rest = &stripped[end + 1..];
            } else {
                literal.push('$');
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Ok(Self {
            text: text.to_string(),
            parts,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Formats against a message batch into `buf` and reports the type of
    /// the produced value.
    pub fn format(
        &self,
        msgs: &[LogMessage],
        options: &TemplateEvalOptions,
        buf: &mut String,
    ) -> ValueType {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => buf.push_str(text),
                TemplatePart::ValueRef(name) => match lookup_value(msgs, name) {
                    Some(value) => buf.push_str(value),
                    None => buf.push_str(&options.missing_value),
                },
            }
        }
        ValueType::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn format(template: &str, msgs: &[LogMessage]) -> String {
        let compiled = LogTemplate::compile(template).unwrap();
        let mut buf = String::new();
        compiled.format(msgs, &TemplateEvalOptions::default(), &mut buf);
        buf
    }

    #[test]
    fn test_format_value_refs() {
        let msg = LogMessage::with_values([("HOST", "web1"), ("PROGRAM", "nginx")]);
        assert_eq!(format("${HOST} runs ${PROGRAM}", &[msg]), "web1 runs nginx");
    }

    #[test]
    fn test_missing_value_and_escape() {
        let msg = LogMessage::new();
        assert_eq!(format("$$${NOPE}!", &[msg]), "$!");
    }

    #[test]
    fn test_unterminated_ref() {
        assert_eq!(
            LogTemplate::compile("${HOST"),
            Err(TemplateError::UnterminatedRef("${HOST".to_string()))
        );
    }
}
