use indexmap::IndexMap;

use super::Object;

/// Insertion-ordered key/value store backing dict objects. Overwriting an
/// existing key keeps its original position; removal preserves the order of
/// the remaining entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedDict {
    entries: IndexMap<String, Object>,
}

impl OrderedDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: Object) -> Option<Object> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Object)> for OrderedDict {
    fn from_iter<T: IntoIterator<Item = (String, Object)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insertion_order() {
        let mut dict = OrderedDict::new();
        dict.insert("b".into(), Object::from(1));
        dict.insert("a".into(), Object::from(2));
        dict.insert("c".into(), Object::from(3));

        let keys: Vec<&str> = dict.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut dict = OrderedDict::new();
        dict.insert("0".into(), Object::from("x"));
        dict.insert("1".into(), Object::from("y"));
        dict.insert("2".into(), Object::from("z"));
        dict.remove("1");

        let keys: Vec<&str> = dict.keys().collect();
        assert_eq!(keys, vec!["0", "2"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut dict = OrderedDict::new();
        dict.insert("x".into(), Object::from(1));
        dict.insert("y".into(), Object::from(2));
        dict.insert("x".into(), Object::from(3));

        let keys: Vec<&str> = dict.keys().collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(dict.get("x"), Some(&Object::from(3)));
    }
}
