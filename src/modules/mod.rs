//! Ansible-style modules over the reconciler

pub mod error;
pub mod interface;
pub mod registry;
pub mod resource;

// Re-export commonly used types
pub use error::*;
pub use interface::*;
pub use registry::ModuleRegistry;
pub use resource::ResourceModule;
