use std::sync::Arc;

use async_graphql::Context;

use crate::datamodel::{Approach, Task, User};
use crate::store::Store;

use super::dataloader::{self, DataLoader, Flush};
use super::loaders::{self, ChildCollection, EntityById, TasksByTypes};

/// The loaders of one GraphQL operation.
///
/// Build a fresh one per request and drop it when the request is done; the caches live exactly
/// as long as this value.
#[derive(Clone)]
pub struct RequestContext {
    pub users_by_id: DataLoader<EntityById<User>>,
    pub tasks_by_id: DataLoader<EntityById<Task>>,
    pub tasks_by_types: DataLoader<TasksByTypes>,
    pub approach_lists: DataLoader<ChildCollection<i32, Approach>>,
}

impl RequestContext {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            users_by_id: loaders::users_by_id(store.clone()),
            tasks_by_id: loaders::tasks_by_id(store.clone()),
            tasks_by_types: loaders::tasks_by_types(store.clone()),
            approach_lists: loaders::approach_lists(store),
        }
    }

    /// Drives `fut`, flushing all loaders together whenever it stalls on them.
    pub async fn run<O>(&self, fut: impl Future<Output = O>) -> O {
        let loaders: [&dyn Flush; 4] = [
            &self.users_by_id,
            &self.tasks_by_id,
            &self.tasks_by_types,
            &self.approach_lists,
        ];
        dataloader::drive(&loaders, fut).await
    }
}

pub trait ContextExt {
    fn loaders(&self) -> async_graphql::Result<&RequestContext>;
}

impl ContextExt for Context<'_> {
    fn loaders(&self) -> async_graphql::Result<&RequestContext> {
        self.data::<RequestContext>()
    }
}
