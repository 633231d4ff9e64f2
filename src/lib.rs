//! Converge - desired-state reconciliation for vendor management APIs
//!
//! This crate compares a declared configuration object against the object a
//! management API reports, then creates, updates or deletes it so the two
//! match, waiting on asynchronous jobs where the API uses them.

pub mod client;
pub mod config;
pub mod modules;
pub mod naming;
pub mod reconcile;
pub mod resources;
pub mod schema;
pub mod state;
pub mod task;

pub use client::{InMemoryClient, RemoteClient, RestClient};
pub use config::Config;
pub use reconcile::{ReconcileError, Reconciler};
pub use resources::{ResourceRegistry, ResourceType};
pub use state::*;
