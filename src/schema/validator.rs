//! Generic argument validation shared by every resource type

use serde_json::{Number, Value};
use tracing::debug;

use super::{FieldSpec, FieldType, ResourceSchema, SchemaError};
use crate::state::{ConfigurationObject, Intent};

pub struct SchemaValidator;

impl SchemaValidator {
    /// Normalise `input` against `schema`.
    ///
    /// `null` values are dropped (unset means leave unchanged), values are
    /// coerced to the declared type and the result is checked against the
    /// schema's JSON Schema form. Defaults are not filled here; see
    /// [`ResourceSchema::with_defaults`]. Required fields without a default
    /// are only enforced for [`Intent::Present`].
    pub fn validate(
        schema: &ResourceSchema,
        input: &ConfigurationObject,
        intent: Intent,
    ) -> Result<ConfigurationObject, SchemaError> {
        let mut unsupported: Vec<String> = input
            .keys()
            .filter(|k| !schema.contains(k))
            .cloned()
            .collect();
        if !unsupported.is_empty() {
            unsupported.sort();
            return Err(SchemaError::UnsupportedParameters { names: unsupported });
        }

        let mut output = ConfigurationObject::new();
        for (key, value) in input {
            if value.is_null() {
                continue;
            }
            let spec = schema
                .field(key)
                .ok_or_else(|| SchemaError::UnsupportedParameters {
                    names: vec![key.clone()],
                })?;
            output.insert(key.clone(), coerce(spec, value)?);
        }

        if intent == Intent::Present {
            let missing: Vec<String> = schema
                .fields
                .iter()
                .filter(|f| f.required && f.default.is_none() && !output.contains_key(&f.name))
                .map(|f| f.name.clone())
                .collect();
            if !missing.is_empty() {
                return Err(SchemaError::MissingRequired { names: missing });
            }
        }

        let document = schema.to_json_schema(intent == Intent::Present);
        let validator =
            jsonschema::draft7::new(&document).map_err(|e| SchemaError::Compile {
                reason: e.to_string(),
            })?;
        let instance = Value::Object(output.clone());
        let errors: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| e.to_string())
            .collect();
        if !errors.is_empty() {
            debug!("Schema validation rejected input: {:?}", errors);
            return Err(SchemaError::Invalid { errors });
        }

        Ok(output)
    }
}

fn coerce(spec: &FieldSpec, value: &Value) -> Result<Value, SchemaError> {
    coerce_as(&spec.name, spec.field_type, spec.elements, value)
}

fn coerce_as(
    field: &str,
    field_type: FieldType,
    elements: Option<FieldType>,
    value: &Value,
) -> Result<Value, SchemaError> {
    let conversion_error = || SchemaError::Conversion {
        field: field.to_string(),
        expected: field_type.as_str().to_string(),
        actual: type_name(value).to_string(),
    };

    match (field_type, value) {
        (FieldType::Raw, v) => Ok(v.clone()),
        (FieldType::Str, Value::String(_)) => Ok(value.clone()),
        (FieldType::Str, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (FieldType::Str, Value::Bool(b)) => Ok(Value::String(b.to_string())),
        (FieldType::Int, Value::Number(n)) => match n.as_i64() {
            Some(_) => Ok(value.clone()),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| Value::Number(Number::from(f as i64)))
                .ok_or_else(conversion_error),
        },
        (FieldType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|i| Value::Number(i.into()))
            .map_err(|_| conversion_error()),
        (FieldType::Bool, Value::Bool(_)) => Ok(value.clone()),
        (FieldType::Bool, Value::String(s)) => {
            parse_bool(s).map(Value::Bool).ok_or_else(conversion_error)
        }
        (FieldType::Bool, Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(conversion_error()),
        },
        (FieldType::List, Value::Array(items)) => match elements {
            Some(element_type) => items
                .iter()
                .map(|item| coerce_as(field, element_type, None, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            None => Ok(value.clone()),
        },
        (FieldType::List, Value::String(s)) => {
            let items: Vec<Value> = s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect();
            coerce_as(field, field_type, elements, &Value::Array(items))
        }
        (FieldType::Dict, Value::Object(_)) => Ok(value.clone()),
        _ => Err(conversion_error()),
    }
}

/// Boolean spellings accepted on input and when comparing remote values.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "y" => Some(true),
        "false" | "no" | "off" | "0" | "n" => Some(false),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new(vec![
            FieldSpec::str("name").required(),
            FieldSpec::int("port"),
            FieldSpec::bool("enabled"),
            FieldSpec::str("visibility")
                .choices(&["enable", "disable"])
                .default_value(json!("enable")),
            FieldSpec::list("aggr_list", FieldType::Str),
            FieldSpec::list("numbers", FieldType::Int),
        ])
    }

    fn input(value: Value) -> ConfigurationObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_coerces_declared_types() {
        let out = SchemaValidator::validate(
            &schema(),
            &input(json!({
                "name": "addr1",
                "port": "8080",
                "enabled": "yes",
                "aggr_list": "aggr1, aggr2",
                "numbers": ["1", 2]
            })),
            Intent::Present,
        )
        .unwrap();

        assert_eq!(out["port"], json!(8080));
        assert_eq!(out["enabled"], json!(true));
        assert_eq!(out["aggr_list"], json!(["aggr1", "aggr2"]));
        assert_eq!(out["numbers"], json!([1, 2]));
    }

    #[test]
    fn test_nulls_dropped_and_defaults_left_unset() {
        let out = SchemaValidator::validate(
            &schema(),
            &input(json!({"name": "addr1", "port": null})),
            Intent::Present,
        )
        .unwrap();

        assert!(!out.contains_key("port"));
        assert!(!out.contains_key("visibility"));
        assert_eq!(schema().with_defaults(&out)["visibility"], "enable");
    }

    #[test]
    fn test_required_field_with_default_may_be_omitted() {
        let schema = ResourceSchema::new(vec![
            FieldSpec::str("name").required(),
            FieldSpec::str("scope").required().default_value(json!("svm")),
        ]);
        let out =
            SchemaValidator::validate(&schema, &input(json!({"name": "p1"})), Intent::Present)
                .unwrap();
        assert!(!out.contains_key("scope"));
    }

    #[test]
    fn test_unsupported_parameters_rejected() {
        let err = SchemaValidator::validate(
            &schema(),
            &input(json!({"name": "addr1", "colour": 3})),
            Intent::Present,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedParameters {
                names: vec!["colour".to_string()]
            }
        );
    }

    #[test]
    fn test_required_only_enforced_when_present() {
        let err =
            SchemaValidator::validate(&schema(), &input(json!({"port": 1})), Intent::Present)
                .unwrap_err();
        assert!(matches!(err, SchemaError::MissingRequired { .. }));

        let out =
            SchemaValidator::validate(&schema(), &input(json!({"port": 1})), Intent::Absent)
                .unwrap();
        assert!(!out.contains_key("visibility"));
    }

    #[test]
    fn test_choices_enforced() {
        let err = SchemaValidator::validate(
            &schema(),
            &input(json!({"name": "addr1", "visibility": "hidden"})),
            Intent::Present,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Invalid { .. }));
    }

    #[test]
    fn test_unconvertible_value() {
        let err = SchemaValidator::validate(
            &schema(),
            &input(json!({"name": "addr1", "port": "eighty"})),
            Intent::Present,
        )
        .unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
