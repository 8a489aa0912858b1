//! Backing stores the loaders fetch from.
//!
//! Every method is a bulk fetch: it takes the whole key set of one batch and returns the
//! matching rows in the store's natural order. Re-keying and grouping is done by the loaders.

use async_trait::async_trait;

use crate::datamodel::{Approach, Task, User};
use crate::error::LoadError;

mod memory;
mod postgres;

pub use memory::MemoryStore;
#[cfg(test)]
pub use memory::Fetch;
pub use postgres::PgStore;

/// Number of tasks on the main list.
pub const LATEST_TASKS_LIMIT: i64 = 100;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>, LoadError>;

    /// Public tasks only.
    async fn tasks_by_ids(&self, ids: &[i32]) -> Result<Vec<Task>, LoadError>;

    /// Newest public tasks first.
    async fn latest_tasks(&self, limit: i64) -> Result<Vec<Task>, LoadError>;

    /// Ordered by vote count, then newest first.
    async fn approaches_by_task_ids(&self, task_ids: &[i32]) -> Result<Vec<Approach>, LoadError>;
}
