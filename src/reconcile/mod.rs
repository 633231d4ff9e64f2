//! Desired-state reconciliation
//!
//! [`Reconciler`] fetches the remote object, asks the [`Comparator`] what
//! has to change, issues the create, update or delete, waits for any job
//! through the [`JobWatcher`] and reports one result.

pub mod comparator;
pub mod error;
pub mod job;
pub mod reconciler;

pub use comparator::{values_equal, Comparator, Comparison};
pub use error::{JobError, ReconcileError};
pub use job::{JobOutcome, JobWatcher};
pub use reconciler::Reconciler;
