//! Lookup table from resource names to resource types

use std::collections::HashMap;

use super::{builtin, ResourceType};

#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, ResourceType>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }

    /// Registry with every built-in resource type registered
    pub fn with_builtin_resources() -> Self {
        let mut registry = Self::new();
        for resource in builtin::all() {
            registry.register(resource);
        }
        registry
    }

    pub fn register(&mut self, resource: ResourceType) {
        self.resources.insert(resource.name.clone(), resource);
    }

    /// Looks a resource up by registry name or by module name.
    pub fn get(&self, name: &str) -> Option<&ResourceType> {
        self.resources
            .get(name)
            .or_else(|| self.resources.values().find(|r| r.module_name == name))
    }

    pub fn list(&self) -> Vec<&ResourceType> {
        let mut resources: Vec<&ResourceType> = self.resources.values().collect();
        resources.sort_by(|a, b| a.module_name.cmp(&b.module_name));
        resources
    }
}
