//! Wire-format key naming
//!
//! Configuration objects use `snake_case` keys internally. Vendor APIs use
//! their own conventions (`kebab-case` for FortiOS, `camelCase` for
//! SANtricity) and occasionally nest a field under another object
//! (`svm.name`). [`KeyMapper`] translates in both directions and is applied
//! once, at the remote client boundary.
//!
//! Translation is total: every key has a wire form. It is reversible for
//! internal keys made of lowercase ASCII segments that each start with a
//! letter; anything else should be listed as an explicit rename.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    #[default]
    Snake,
    Kebab,
    Camel,
}

impl NamingConvention {
    pub fn to_wire(self, key: &str) -> String {
        match self {
            NamingConvention::Snake => key.to_string(),
            NamingConvention::Kebab => key.replace('_', "-"),
            NamingConvention::Camel => {
                let mut out = String::with_capacity(key.len());
                let mut upper = false;
                for c in key.chars() {
                    if c == '_' {
                        upper = true;
                    } else if upper {
                        out.extend(c.to_uppercase());
                        upper = false;
                    } else {
                        out.push(c);
                    }
                }
                out
            }
        }
    }

    pub fn from_wire(self, key: &str) -> String {
        match self {
            NamingConvention::Snake => key.to_string(),
            NamingConvention::Kebab => key.replace('-', "_"),
            NamingConvention::Camel => {
                let mut out = String::with_capacity(key.len() + 4);
                for c in key.chars() {
                    if c.is_ascii_uppercase() {
                        out.push('_');
                        out.push(c.to_ascii_lowercase());
                    } else {
                        out.push(c);
                    }
                }
                out
            }
        }
    }
}

/// Explicit top-level rename. A dotted wire name nests the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub internal: String,
    pub wire: String,
}

impl Rename {
    pub fn new(internal: impl Into<String>, wire: impl Into<String>) -> Self {
        Self {
            internal: internal.into(),
            wire: wire.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapper {
    pub convention: NamingConvention,
    #[serde(default)]
    pub renames: Vec<Rename>,
}

impl KeyMapper {
    pub fn new(convention: NamingConvention) -> Self {
        Self {
            convention,
            renames: Vec::new(),
        }
    }

    pub fn rename(mut self, internal: &str, wire: &str) -> Self {
        self.renames.push(Rename::new(internal, wire));
        self
    }

    /// Wire name for a top-level key, dotted when the value is nested.
    pub fn wire_key(&self, internal: &str) -> String {
        self.renames
            .iter()
            .find(|r| r.internal == internal)
            .map(|r| r.wire.clone())
            .unwrap_or_else(|| self.convention.to_wire(internal))
    }

    pub fn to_wire(&self, object: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in object {
            let value = self.value_to_wire(value);
            match self.renames.iter().find(|r| r.internal == *key) {
                Some(rename) => insert_dotted(&mut out, &rename.wire, value),
                None => {
                    out.insert(self.convention.to_wire(key), value);
                }
            }
        }
        out
    }

    pub fn from_wire(&self, object: &Map<String, Value>) -> Map<String, Value> {
        let mut remaining = object.clone();
        let mut out = Map::new();
        for rename in &self.renames {
            if let Some(value) = take_dotted(&mut remaining, &rename.wire) {
                out.insert(rename.internal.clone(), self.value_from_wire(&value));
            }
        }
        for (key, value) in &remaining {
            out.insert(self.convention.from_wire(key), self.value_from_wire(value));
        }
        out
    }

    fn value_to_wire(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (self.convention.to_wire(k), self.value_to_wire(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.value_to_wire(v)).collect()),
            other => other.clone(),
        }
    }

    fn value_from_wire(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (self.convention.from_wire(k), self.value_from_wire(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.value_from_wire(v)).collect())
            }
            other => other.clone(),
        }
    }
}

fn insert_dotted(target: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut root = Value::Object(std::mem::take(target));
    insert_path(&mut root, &segments, value);
    if let Value::Object(map) = root {
        *target = map;
    }
}

/// Numeric segments index into arrays, all others into objects.
fn insert_path(target: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    let child = match head.parse::<usize>() {
        Ok(index) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            let Value::Array(items) = target else { return };
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        Err(_) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let Value::Object(map) = target else { return };
            map.entry(head.to_string()).or_insert(Value::Null)
        }
    };
    insert_path(child, rest, value);
}

fn take_dotted(source: &mut Map<String, Value>, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut root = Value::Object(std::mem::take(source));
    let taken = take_path(&mut root, &segments);
    if let Value::Object(map) = root {
        *source = map;
    }
    taken
}

fn take_path(source: &mut Value, segments: &[&str]) -> Option<Value> {
    let (head, rest) = segments.split_first()?;
    let taken = if rest.is_empty() {
        match source {
            Value::Object(map) => map.remove(*head),
            Value::Array(items) => head
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .map(Value::take),
            _ => None,
        }
    } else {
        let child = match source {
            Value::Object(map) => map.get_mut(*head),
            Value::Array(items) => head.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        };
        child.and_then(|child| take_path(child, rest))
    };

    if let Some(map) = source.as_object_mut() {
        if map.get(*head).is_some_and(is_hollow) {
            map.remove(*head);
        }
    }
    taken
}

/// Containers left with nothing but nulls and other hollow containers.
fn is_hollow(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().all(|v| v.is_null() || is_hollow(v)),
        Value::Array(items) => items.iter().all(|v| v.is_null() || is_hollow(v)),
        _ => false,
    }
}
