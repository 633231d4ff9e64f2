//! Resource module - exposes one resource type as a present/absent module

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::client::RemoteClient;
use crate::modules::{
    error::{ModuleError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};
use crate::reconcile::Reconciler;
use crate::resources::ResourceType;
use crate::schema::validator::parse_bool;
use crate::schema::SchemaValidator;
use crate::state::{ConfigurationObject, DesiredState, ExecutionOptions, Intent};

/// Module arguments split into intent, options and resource fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitArgs {
    pub intent: Intent,
    pub options: ExecutionOptions,
    pub fields: ConfigurationObject,
}

pub struct ResourceModule<C> {
    resource: ResourceType,
    reconciler: Arc<Reconciler<C>>,
}

impl<C: RemoteClient> ResourceModule<C> {
    pub fn new(resource: ResourceType, reconciler: Arc<Reconciler<C>>) -> Self {
        Self {
            resource,
            reconciler,
        }
    }

    pub fn resource(&self) -> &ResourceType {
        &self.resource
    }

    pub fn split_args(
        &self,
        args: &ModuleArgs,
        defaults: &ExecutionOptions,
    ) -> Result<SplitArgs, ValidationError> {
        let mut options = defaults.clone();
        let mut intent = Intent::Present;
        let mut fields = ConfigurationObject::new();

        for (key, value) in &args.args {
            match key.as_str() {
                // unset options keep their defaults
                "state" | "timeout" | "time_out" | "poll_interval" | "force_unmount"
                | "force_offline"
                    if value.is_null() => {}
                "state" => {
                    let raw = value.as_str().unwrap_or_default();
                    intent = raw
                        .parse()
                        .map_err(|reason: String| ValidationError::invalid(key, value, reason))?;
                }
                "timeout" | "time_out" => options.timeout_secs = seconds(key, value)?,
                "poll_interval" => options.poll_interval_secs = seconds(key, value)?.max(1),
                "force_unmount" => options.force_unmount = flag(key, value)?,
                "force_offline" => options.force_offline = flag(key, value)?,
                _ => {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }

        if args.special.check_mode {
            options.check_mode = true;
        }
        if args.special.diff {
            options.diff_mode = true;
        }

        Ok(SplitArgs {
            intent,
            options,
            fields,
        })
    }

    async fn reconcile(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        force_check: bool,
    ) -> Result<ModuleResult, ModuleError> {
        let mut split = self.split_args(args, &context.defaults)?;
        split.options.check_mode |= context.check_mode || force_check;
        split.options.diff_mode |= context.diff_mode;

        let desired = DesiredState::new(self.resource.name.clone(), split.intent, split.fields)
            .with_options(split.options);
        let result = self.reconciler.run(&desired).await;
        Ok(ModuleResult::from(result))
    }
}

#[async_trait]
impl<C: RemoteClient + 'static> ExecutionModule for ResourceModule<C> {
    fn name(&self) -> &str {
        &self.resource.module_name
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleError> {
        self.reconcile(args, context, false).await
    }

    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ValidationError> {
        let split = self.split_args(args, &ExecutionOptions::default())?;
        SchemaValidator::validate(&self.resource.schema, &split.fields, split.intent)?;
        Ok(())
    }

    async fn check_mode(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleError> {
        self.reconcile(args, context, true).await
    }

    fn documentation(&self) -> ModuleDocumentation {
        let mut arguments: Vec<ArgumentSpec> = self
            .resource
            .schema
            .fields
            .iter()
            .map(|field| ArgumentSpec {
                name: field.name.clone(),
                description: field.description.clone(),
                required: field.required,
                argument_type: match field.elements {
                    Some(elements) => {
                        format!("{} of {}", field.field_type.as_str(), elements.as_str())
                    }
                    None => field.field_type.as_str().to_string(),
                },
                default: field.default.as_ref().map(Value::to_string),
                choices: field.choices.clone(),
                no_log: field.no_log,
            })
            .collect();

        arguments.push(option_arg(
            "state",
            "Whether the object should exist or not",
            "str",
            Some("present"),
            &["present", "absent"],
        ));
        arguments.push(option_arg(
            "timeout",
            "Seconds to wait for asynchronous jobs; 0 returns without waiting",
            "int",
            Some("180"),
            &[],
        ));
        arguments.push(option_arg(
            "poll_interval",
            "Seconds between job status checks",
            "int",
            Some("5"),
            &[],
        ));
        if self.resource.unmount.is_some() {
            arguments.push(option_arg(
                "force_unmount",
                "Unmount the object before deleting it",
                "bool",
                Some("false"),
                &[],
            ));
        }
        if self.resource.offline.is_some() {
            arguments.push(option_arg(
                "force_offline",
                "Take the object offline before deleting it",
                "bool",
                Some("false"),
                &[],
            ));
        }

        let mut example = format!("{}:\n    state: present", self.resource.module_name);
        for field in self.resource.schema.fields.iter().filter(|f| f.required) {
            example.push_str(&format!("\n    {}: <{}>", field.name, field.name));
        }

        ModuleDocumentation {
            description: self.resource.description.clone(),
            arguments,
            examples: vec![example],
            return_values: vec![
                ReturnValueSpec {
                    name: "msg".to_string(),
                    description: "A short description of what happened".to_string(),
                    returned: "always".to_string(),
                    value_type: "str".to_string(),
                },
                ReturnValueSpec {
                    name: "response".to_string(),
                    description: "Payload of the last API call".to_string(),
                    returned: "on change or failure".to_string(),
                    value_type: "dict".to_string(),
                },
                ReturnValueSpec {
                    name: "diff".to_string(),
                    description: "Fields before and after the change".to_string(),
                    returned: "in diff mode".to_string(),
                    value_type: "dict".to_string(),
                },
            ],
        }
    }
}

fn option_arg(
    name: &str,
    description: &str,
    argument_type: &str,
    default: Option<&str>,
    choices: &[&str],
) -> ArgumentSpec {
    ArgumentSpec {
        name: name.to_string(),
        description: description.to_string(),
        required: false,
        argument_type: argument_type.to_string(),
        default: default.map(str::to_string),
        choices: choices.iter().map(|c| c.to_string()).collect(),
        no_log: false,
    }
}

fn seconds(key: &str, value: &Value) -> Result<u64, ValidationError> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ValidationError::invalid(key, value, "expected a non-negative integer"))
}

fn flag(key: &str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
    .ok_or_else(|| ValidationError::invalid(key, value, "expected a boolean"))
}
