//! Desired/current state comparison

use serde_json::Value;
use tracing::debug;

use super::ReconcileError;
use crate::resources::ResourceType;
use crate::schema::validator::parse_bool;
use crate::schema::FieldSpec;
use crate::state::{Action, ConfigurationObject, Intent};

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub exists: bool,
    pub action: Action,
    /// Fields to send: the desired object plus schema defaults for a
    /// create, the changed
    /// user-set fields for an update, empty otherwise.
    pub diff: ConfigurationObject,
}

pub struct Comparator<'a> {
    resource: &'a ResourceType,
}

impl<'a> Comparator<'a> {
    pub fn new(resource: &'a ResourceType) -> Self {
        Self { resource }
    }

    /// Decides the action needed to move `current` to `desired`.
    ///
    /// Only fields present in `desired` are inspected. Identity fields are
    /// skipped on update since the lookup already matched them.
    pub fn compare(
        &self,
        intent: Intent,
        desired: &ConfigurationObject,
        current: Option<&ConfigurationObject>,
    ) -> Result<Comparison, ReconcileError> {
        let exists = current.is_some();
        let (action, diff) = match (intent, current) {
            (Intent::Absent, None) => (Action::None, ConfigurationObject::new()),
            (Intent::Absent, Some(_)) => (Action::Delete, ConfigurationObject::new()),
            (Intent::Present, None) => {
                (Action::Create, self.resource.schema.with_defaults(desired))
            }
            (Intent::Present, Some(current)) => {
                let diff = self.diff(desired, current);
                self.check_immutable(desired, &diff)?;
                let action = if diff.is_empty() {
                    Action::None
                } else {
                    Action::Update
                };
                (action, diff)
            }
        };

        debug!(
            resource = %self.resource.name,
            exists,
            %action,
            fields = ?diff.keys().collect::<Vec<_>>(),
            "compared desired and current state"
        );
        Ok(Comparison {
            exists,
            action,
            diff,
        })
    }

    fn diff(
        &self,
        desired: &ConfigurationObject,
        current: &ConfigurationObject,
    ) -> ConfigurationObject {
        desired
            .iter()
            .filter(|(field, _)| !self.resource.is_identity(field))
            .filter(|(field, wanted)| {
                let spec = self.resource.schema.field(field);
                match current.get(*field) {
                    Some(actual) => !values_equal(spec, wanted, actual),
                    None => true,
                }
            })
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    fn check_immutable(
        &self,
        desired: &ConfigurationObject,
        diff: &ConfigurationObject,
    ) -> Result<(), ReconcileError> {
        let fields: Vec<String> = diff
            .keys()
            .filter(|f| self.resource.is_immutable(f))
            .cloned()
            .collect();
        if fields.is_empty() {
            return Ok(());
        }
        Err(ReconcileError::ModifyNotSupported {
            target: format!(
                "{} {}",
                self.resource.name,
                self.resource.describe_identity(desired)
            ),
            fields,
        })
    }
}

/// Deep equality that tolerates the vendors' loose typing.
///
/// Numbers equal their decimal string form, booleans equal their
/// `yes`/`no`/`true`/`false` spellings and a missing value equals `null`.
/// Lists are ordered unless `spec` marks the field unordered. Nested
/// objects compare only the keys set in `desired`, so keys the server adds
/// are ignored.
pub fn values_equal(spec: Option<&FieldSpec>, desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            let s = s.trim();
            s == n.to_string() || s.parse::<f64>().ok() == n.as_f64()
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            parse_bool(s) == Some(*b)
        }
        (Value::Array(a), Value::Array(b)) => {
            if spec.is_some_and(|f| f.unordered) {
                same_elements(a, b)
            } else {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(None, x, y))
            }
        }
        (Value::Object(wanted), Value::Object(found)) => {
            wanted.iter().all(|(k, v)| match found.get(k) {
                Some(o) => values_equal(None, v, o),
                None => v.is_null(),
            })
        }
        (a, b) => a == b,
    }
}

/// Multiset comparison.
fn same_elements(desired: &[Value], actual: &[Value]) -> bool {
    if desired.len() != actual.len() {
        return false;
    }
    let mut used = vec![false; actual.len()];
    desired.iter().all(|wanted| {
        let found = actual
            .iter()
            .enumerate()
            .find(|(i, candidate)| !used[*i] && values_equal(None, wanted, candidate))
            .map(|(i, _)| i);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}
