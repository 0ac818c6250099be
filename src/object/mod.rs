pub mod dict;

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use serde_json::Value as JsonValue;
use thiserror::Error;

pub use dict::OrderedDict;

/// Type tags for values. Message values carry one of these alongside their
/// unparsed text, the way record fields are type-hinted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ValueType {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    List,
    Dict,
}

#[derive(Debug, Error, PartialEq)]
pub enum ObjectError {
    #[error("object of type {0} is not indexable")]
    NotIndexable(&'static str),
    #[error("invalid subscript key of type {key} for {container}")]
    InvalidKey {
        container: &'static str,
        key: &'static str,
    },
    #[error("list index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("list subscript requires an index key")]
    MissingKey,
    #[error("key {0:?} not found")]
    KeyNotFound(String),
}

/// A type-tagged value sharing a formatted scratch buffer. The text is never
/// copied out of the buffer it was rendered into; the `Rc` keeps the storage
/// alive for the rest of the evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageValue {
    text: Rc<str>,
    vtype: ValueType,
}

impl MessageValue {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value_type(&self) -> ValueType {
        self.vtype
    }
}

/// Runtime value handle. Containers share their storage on clone (the
/// handle-copy the evaluator passes around); [`Object::deep_clone`] makes an
/// independent copy.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(Rc<str>),
    List(Rc<RefCell<Vec<Object>>>),
    Dict(Rc<RefCell<OrderedDict>>),
    Message(MessageValue),
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Object::Integer(i)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Object::String(Rc::from(s))
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Object::String(Rc::from(s.as_str()))
    }
}

impl Object {
    pub fn empty_list() -> Self {
        Object::List(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn empty_dict() -> Self {
        Object::Dict(Rc::new(RefCell::new(OrderedDict::new())))
    }

    pub fn list_from(items: impl IntoIterator<Item = Object>) -> Self {
        Object::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn dict_from(entries: impl IntoIterator<Item = (String, Object)>) -> Self {
        Object::Dict(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    /// Wraps a formatted buffer without copying it; see [`MessageValue`].
    pub fn message_borrowed(text: Rc<str>, vtype: ValueType) -> Self {
        Object::Message(MessageValue { text, vtype })
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Object::Null => ValueType::Null,
            Object::Boolean(_) => ValueType::Boolean,
            Object::Integer(_) => ValueType::Integer,
            Object::Double(_) => ValueType::Double,
            Object::String(_) => ValueType::String,
            Object::List(_) => ValueType::List,
            Object::Dict(_) => ValueType::Dict,
            Object::Message(mv) => mv.vtype,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Message(_) => "message_value",
            other => other.value_type().into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
            || matches!(self, Object::Message(mv) if mv.vtype == ValueType::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Object::String(_))
            || matches!(self, Object::Message(mv) if mv.vtype == ValueType::String)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Object::List(_))
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, Object::Dict(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::String(s) => Some(s),
            Object::Message(mv) if mv.vtype == ValueType::String => Some(mv.text()),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Object::Null => false,
            Object::Boolean(b) => *b,
            Object::Integer(i) => *i != 0,
            Object::Double(d) => *d != 0.0,
            Object::String(s) => !s.is_empty(),
            Object::List(items) => !items.borrow().is_empty(),
            Object::Dict(dict) => !dict.borrow().is_empty(),
            Object::Message(mv) => message_value_truthy(mv),
        }
    }

    /// Renders the display representation into `buf`. Containers render as
    /// JSON text. Returns false when the value has no representation (never
    /// the case for the types this runtime produces, kept for parity with
    /// the marshal fallback the callers implement).
    pub fn repr(&self, buf: &mut String) -> bool {
        match self {
            Object::Null => buf.push_str("null"),
            Object::Boolean(b) => buf.push_str(if *b { "true" } else { "false" }),
            Object::Integer(i) => {
                let _ = write!(buf, "{}", i);
            }
            Object::Double(d) => {
                let _ = write!(buf, "{}", d);
            }
            Object::String(s) => buf.push_str(s),
            Object::Message(mv) => buf.push_str(mv.text()),
            Object::List(_) | Object::Dict(_) => {
                let json = self.to_json();
                let _ = write!(buf, "{}", json);
            }
        }
        true
    }

    /// Typed serialization: renders like [`Object::repr`] and reports the
    /// value type of what was written.
    pub fn marshal(&self, buf: &mut String) -> ValueType {
        self.repr(buf);
        self.value_type()
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Object::Null => JsonValue::Null,
            Object::Boolean(b) => JsonValue::Bool(*b),
            Object::Integer(i) => JsonValue::from(*i),
            Object::Double(d) => serde_json::Number::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Object::String(s) => JsonValue::String(s.to_string()),
            Object::Message(mv) => JsonValue::String(mv.text().to_string()),
            Object::List(items) => {
                JsonValue::Array(items.borrow().iter().map(Object::to_json).collect())
            }
            Object::Dict(dict) => JsonValue::Object(
                dict.borrow()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Recursive copy with independent container storage.
    pub fn deep_clone(&self) -> Object {
        match self {
            Object::List(items) => Object::List(Rc::new(RefCell::new(
                items.borrow().iter().map(Object::deep_clone).collect(),
            ))),
            Object::Dict(dict) => Object::Dict(Rc::new(RefCell::new(
                dict.borrow()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.deep_clone()))
                    .collect(),
            ))),
            other => other.clone(),
        }
    }

    /// Shares identity with `other` (same underlying container storage).
    pub fn shares_storage(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::List(a), Object::List(b)) => Rc::ptr_eq(a, b),
            (Object::Dict(a), Object::Dict(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn key_string(&self, container: &'static str) -> Result<String, ObjectError> {
        self.as_str()
            .map(str::to_string)
            .ok_or(ObjectError::InvalidKey {
                container,
                key: self.type_name(),
            })
    }

    /// Generic subscript assignment. On a dict the key is required and must
    /// be string-valued; on a list a missing key appends.
    pub fn set_subscript(&self, key: Option<&Object>, value: Object) -> Result<(), ObjectError> {
        match self {
            Object::Dict(dict) => {
                let key = key.ok_or(ObjectError::MissingKey)?.key_string("dict")?;
                dict.borrow_mut().insert(key, value);
                Ok(())
            }
            Object::List(items) => match key {
                None => {
                    items.borrow_mut().push(value);
                    Ok(())
                }
                Some(Object::Integer(i)) => {
                    let mut items = items.borrow_mut();
                    let idx = usize::try_from(*i)
                        .map_err(|_| ObjectError::IndexOutOfRange(items.len()))?;
                    if idx >= items.len() {
                        return Err(ObjectError::IndexOutOfRange(idx));
                    }
                    items[idx] = value;
                    Ok(())
                }
                Some(other) => Err(ObjectError::InvalidKey {
                    container: "list",
                    key: other.type_name(),
                }),
            },
            other => Err(ObjectError::NotIndexable(other.type_name())),
        }
    }

    pub fn get_subscript(&self, key: &Object) -> Result<Object, ObjectError> {
        match self {
            Object::Dict(dict) => {
                let key = key.key_string("dict")?;
                dict.borrow()
                    .get(&key)
                    .cloned()
                    .ok_or(ObjectError::KeyNotFound(key))
            }
            Object::List(items) => match key {
                Object::Integer(i) => {
                    let items = items.borrow();
                    usize::try_from(*i)
                        .ok()
                        .and_then(|idx| items.get(idx).cloned())
                        .ok_or(ObjectError::IndexOutOfRange(items.len()))
                }
                other => Err(ObjectError::InvalidKey {
                    container: "list",
                    key: other.type_name(),
                }),
            },
            other => Err(ObjectError::NotIndexable(other.type_name())),
        }
    }

    pub fn unset_key(&self, key: &Object) -> Result<(), ObjectError> {
        match self {
            Object::Dict(dict) => {
                let key = key.key_string("dict")?;
                dict.borrow_mut()
                    .remove(&key)
                    .map(|_| ())
                    .ok_or(ObjectError::KeyNotFound(key))
            }
            other => Err(ObjectError::NotIndexable(other.type_name())),
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Object::List(items) => Some(items.borrow().len()),
            Object::Dict(dict) => Some(dict.borrow().len()),
            Object::String(s) => Some(s.len()),
            Object::Message(mv) => Some(mv.text().len()),
            _ => None,
        }
    }

    /// Creates an empty dict chained to this container, inheriting its
    /// flavor. None if `self` is not a container.
    pub fn create_dict_child(&self) -> Option<Object> {
        match self {
            Object::List(_) | Object::Dict(_) => Some(Object::empty_dict()),
            _ => None,
        }
    }

    /// List-shaped counterpart of [`Object::create_dict_child`].
    pub fn create_list_child(&self) -> Option<Object> {
        match self {
            Object::List(_) | Object::Dict(_) => Some(Object::empty_list()),
            _ => None,
        }
    }
}

fn message_value_truthy(mv: &MessageValue) -> bool {
    let text = mv.text();
    match mv.vtype {
        ValueType::Null => false,
        ValueType::Boolean => matches!(text, "true" | "True" | "1"),
        ValueType::Integer => text.parse::<i64>().map(|i| i != 0).unwrap_or(false),
        ValueType::Double => text.parse::<f64>().map(|d| d != 0.0).unwrap_or(false),
        _ => !text.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truthiness() {
        assert!(!Object::Null.truthy());
        assert!(Object::from(true).truthy());
        assert!(!Object::from(0).truthy());
        assert!(Object::from("x").truthy());
        assert!(!Object::from("").truthy());
        assert!(!Object::empty_list().truthy());
        assert!(Object::list_from([Object::Null]).truthy());
    }

    #[test]
    fn test_repr() {
        let mut buf = String::new();
        assert!(Object::from(42).repr(&mut buf));
        assert_eq!(buf, "42");

        let mut buf = String::new();
        let dict = Object::dict_from([("a".to_string(), Object::from(1))]);
        assert!(dict.repr(&mut buf));
        assert_eq!(buf, r#"{"a":1}"#);
    }

    #[test]
    fn test_deep_clone_detaches_storage() {
        let list = Object::list_from([Object::from(1)]);
        let clone = list.deep_clone();
        assert!(!list.shares_storage(&clone));

        list.set_subscript(None, Object::from(2)).unwrap();
        assert_eq!(list.len(), Some(2));
        assert_eq!(clone.len(), Some(1));
    }

    #[test]
    fn test_dict_subscripts() {
        let dict = Object::empty_dict();
        dict.set_subscript(Some(&Object::from("k")), Object::from("v"))
            .unwrap();
        assert_eq!(
            dict.get_subscript(&Object::from("k")).unwrap(),
            Object::from("v")
        );
        dict.unset_key(&Object::from("k")).unwrap();
        assert_eq!(dict.len(), Some(0));
    }

    #[test]
    fn test_list_append_via_missing_key() {
        let list = Object::empty_list();
        list.set_subscript(None, Object::from("a")).unwrap();
        list.set_subscript(None, Object::from("b")).unwrap();
        assert_eq!(
            list.get_subscript(&Object::from(1)).unwrap(),
            Object::from("b")
        );
    }

    #[test]
    fn test_scalar_is_not_indexable() {
        let err = Object::from(5)
            .set_subscript(None, Object::Null)
            .unwrap_err();
        assert_eq!(err, ObjectError::NotIndexable("integer"));
    }

    #[test]
    fn test_message_value_truthiness() {
        let truthy = Object::message_borrowed(Rc::from("true"), ValueType::Boolean);
        let falsy = Object::message_borrowed(Rc::from("0"), ValueType::Integer);
        assert!(truthy.truthy());
        assert!(!falsy.truthy());
    }
}
