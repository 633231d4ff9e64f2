//! Module interface traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::error::{ModuleError, ValidationError};
use crate::state::{Action, ConfigurationObject, ExecutionOptions, FieldChanges, ReconciliationResult};

/// Unified interface for all resource modules
#[async_trait]
pub trait ExecutionModule: Send + Sync {
    /// Module name (e.g., "na_ontap_flexcache")
    fn name(&self) -> &str;

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleError>;

    /// Validate module arguments before execution
    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ValidationError>;

    /// Report what `execute` would change without changing anything
    async fn check_mode(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleError>;

    fn documentation(&self) -> ModuleDocumentation;
}

/// Module execution arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleArgs {
    /// Direct module arguments
    #[serde(default)]
    pub args: ConfigurationObject,
    /// Special parameters
    #[serde(default)]
    pub special: SpecialParameters,
}

impl ModuleArgs {
    pub fn new(args: ConfigurationObject) -> Self {
        Self {
            args,
            special: SpecialParameters::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialParameters {
    #[serde(default)]
    pub check_mode: bool,
    #[serde(default)]
    pub diff: bool,
}

/// Module execution context
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Option defaults; module arguments override them per task.
    pub defaults: ExecutionOptions,
    pub check_mode: bool,
    pub diff_mode: bool,
}

/// Module execution result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub failed: bool,
    pub msg: Option<String>,
    pub action: Action,
    /// Raw vendor payload of the last call.
    #[serde(default)]
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<FieldChanges>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ModuleResult {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            changed: false,
            failed: true,
            msg: Some(msg.into()),
            action: Action::None,
            response: Value::Null,
            diff: None,
            warnings: Vec::new(),
        }
    }
}

impl From<ReconciliationResult> for ModuleResult {
    fn from(result: ReconciliationResult) -> Self {
        Self {
            changed: result.changed,
            failed: result.failed,
            msg: Some(result.message).filter(|m| !m.is_empty()),
            action: result.action,
            response: result.response,
            diff: result.diff,
            warnings: Vec::new(),
        }
    }
}

/// Module documentation
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDocumentation {
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,
    pub examples: Vec<String>,
    pub return_values: Vec<ReturnValueSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub argument_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_log: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnValueSpec {
    pub name: String,
    pub description: String,
    pub returned: String,
    pub value_type: String,
}
