//! Central registry for all resource modules

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::client::RemoteClient;
use crate::modules::{
    error::ModuleError,
    interface::{ExecutionContext, ExecutionModule, ModuleArgs, ModuleResult},
    resource::ResourceModule,
};
use crate::reconcile::Reconciler;
use crate::resources::ResourceRegistry;

/// Central registry for all resource modules
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn ExecutionModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// One module per built-in resource type, all sharing `client`.
    pub fn for_client<C: RemoteClient + 'static>(client: C) -> Self {
        Self::with_resources(client, ResourceRegistry::with_builtin_resources())
    }

    pub fn with_resources<C: RemoteClient + 'static>(client: C, resources: ResourceRegistry) -> Self {
        let types: Vec<_> = resources.list().into_iter().cloned().collect();
        let reconciler = Arc::new(Reconciler::new(client, resources));

        let mut registry = Self::new();
        for resource in types {
            registry.register(Box::new(ResourceModule::new(resource, reconciler.clone())));
        }
        registry
    }

    pub fn register(&mut self, module: Box<dyn ExecutionModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn get_module(&self, name: &str) -> Option<&dyn ExecutionModule> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn list_modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub async fn execute_module(
        &self,
        module_name: &str,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleError> {
        let module = self
            .get_module(module_name)
            .ok_or_else(|| ModuleError::ModuleNotFound {
                name: module_name.to_string(),
            })?;

        module.validate_args(args)?;
        debug!(module = module_name, "arguments validated");

        if context.check_mode || args.special.check_mode {
            module.check_mode(args, context).await
        } else {
            module.execute(args, context).await
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
