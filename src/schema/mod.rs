//! Declarative option schemas for resource types
//!
//! Each resource type supplies a table of [`FieldSpec`]s. One generic
//! validator (see [`validator`]) coerces and checks user input
//! against that table; nothing is validated by hand per resource.

pub mod error;
pub mod validator;

pub use error::SchemaError;
pub use validator::SchemaValidator;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::state::ConfigurationObject;

/// Placeholder written in place of `no_log` values.
pub const MASKED_VALUE: &str = "********";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Str,
    Int,
    Bool,
    List,
    Dict,
    Raw,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Str => "str",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::List => "list",
            FieldType::Dict => "dict",
            FieldType::Raw => "raw",
        }
    }

    fn json_type(self) -> Option<&'static str> {
        match self {
            FieldType::Str => Some("string"),
            FieldType::Int => Some("integer"),
            FieldType::Bool => Some("boolean"),
            FieldType::List => Some("array"),
            FieldType::Dict => Some("object"),
            FieldType::Raw => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    /// Element type for `list` fields.
    pub elements: Option<FieldType>,
    /// Required when the resource should be present.
    pub required: bool,
    pub default: Option<Value>,
    pub choices: Vec<String>,
    /// List compares as a set rather than a sequence.
    pub unordered: bool,
    pub no_log: bool,
    pub description: String,
}

impl FieldSpec {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            elements: None,
            required: false,
            default: None,
            choices: Vec::new(),
            unordered: false,
            no_log: false,
            description: String::new(),
        }
    }

    pub fn str(name: &str) -> Self {
        Self::new(name, FieldType::Str)
    }

    pub fn int(name: &str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn list(name: &str, elements: FieldType) -> Self {
        let mut spec = Self::new(name, FieldType::List);
        spec.elements = Some(elements);
        spec
    }

    pub fn dict(name: &str) -> Self {
        Self::new(name, FieldType::Dict)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn unordered(mut self) -> Self {
        self.unordered = true;
        self
    }

    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        if let Some(t) = self.field_type.json_type() {
            schema.insert("type".into(), json!(t));
        }
        if let Some(t) = self.elements.and_then(FieldType::json_type) {
            schema.insert("items".into(), json!({ "type": t }));
        }
        if !self.choices.is_empty() {
            let choices = json!(self.choices);
            if self.field_type == FieldType::List {
                schema.insert("items".into(), json!({ "enum": choices }));
            } else {
                schema.insert("enum".into(), choices);
            }
        }
        Value::Object(schema)
    }
}

/// The option table for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceSchema {
    pub fields: Vec<FieldSpec>,
}

impl ResourceSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// JSON Schema (draft 7) equivalent of the table.
    pub fn to_json_schema(&self, require_fields: bool) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.json_schema()))
            .collect();
        let required: Vec<&str> = if require_fields {
            self.fields
                .iter()
                .filter(|f| f.required && f.default.is_none())
                .map(|f| f.name.as_str())
                .collect()
        } else {
            Vec::new()
        };

        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    /// Copy of `object` with declared defaults filling unset fields.
    ///
    /// Only create payloads get defaults; an existing object keeps whatever
    /// the user left unset.
    pub fn with_defaults(&self, object: &ConfigurationObject) -> ConfigurationObject {
        let mut filled = object.clone();
        for field in &self.fields {
            if let Some(default) = &field.default {
                filled
                    .entry(field.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
        filled
    }

    /// Copy of `object` with every `no_log` value replaced.
    pub fn mask(&self, object: &ConfigurationObject) -> ConfigurationObject {
        object
            .iter()
            .map(|(k, v)| {
                let masked = matches!(self.field(k), Some(f) if f.no_log);
                let value = if masked {
                    Value::String(MASKED_VALUE.to_string())
                } else {
                    v.clone()
                };
                (k.clone(), value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_shape() {
        let schema = ResourceSchema::new(vec![
            FieldSpec::str("name").required(),
            FieldSpec::str("visibility").choices(&["enable", "disable"]),
            FieldSpec::list("aggr_list", FieldType::Str),
        ]);

        let doc = schema.to_json_schema(true);
        assert_eq!(doc["required"], json!(["name"]));
        assert_eq!(doc["properties"]["visibility"]["enum"], json!(["enable", "disable"]));
        assert_eq!(doc["properties"]["aggr_list"]["items"]["type"], "string");
        assert_eq!(doc["additionalProperties"], false);

        let relaxed = schema.to_json_schema(false);
        assert_eq!(relaxed["required"], json!([]));
    }

    #[test]
    fn test_mask_hides_secrets() {
        let schema = ResourceSchema::new(vec![
            FieldSpec::str("bind_user"),
            FieldSpec::str("bind_password").no_log(),
        ]);
        let mut object = ConfigurationObject::new();
        object.insert("bind_user".into(), json!("admin"));
        object.insert("bind_password".into(), json!("hunter2"));

        let masked = schema.mask(&object);
        assert_eq!(masked["bind_user"], "admin");
        assert_eq!(masked["bind_password"], MASKED_VALUE);
    }
}
