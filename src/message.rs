use std::collections::HashMap;

/// One in-flight log record: a set of named values. This is the thin shim
/// over the pipeline's record store that the evaluation core needs; parsing,
/// persistence and transport live elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogMessage {
    values: HashMap<String, String>,
}

impl LogMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Resolves a named value against a message batch. Later messages shadow
/// earlier ones, matching how correlation contexts stack records.
pub fn lookup_value<'a>(msgs: &'a [LogMessage], name: &str) -> Option<&'a str> {
    msgs.iter().rev().find_map(|msg| msg.value(name))
}
