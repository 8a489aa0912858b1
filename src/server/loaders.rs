use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::datamodel::{Approach, Task, User};
use crate::error::LoadError;
use crate::store::{LATEST_TASKS_LIMIT, Store};

use super::dataloader::{BatchFn, BatchResult, DataLoader};

/// Bulk fetch supplied by the caller: all rows matching the given keys, in store order.
pub type FetchRows<K, T> =
    Arc<dyn Fn(Vec<K>) -> BoxFuture<'static, Result<Vec<T>, LoadError>> + Send + Sync>;

/// A row addressable by its primary key.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Hash + Eq + Clone + Debug + Send + Sync + 'static;

    /// Used in "not found" errors.
    const NAME: &'static str;

    fn id(&self) -> Self::Id;
}

impl Entity for User {
    type Id = i32;
    const NAME: &'static str = "User";

    fn id(&self) -> i32 {
        self.id
    }
}

impl Entity for Task {
    type Id = i32;
    const NAME: &'static str = "Task";

    fn id(&self) -> i32 {
        self.id
    }
}

/// Re-keys `rows` by id and answers every key in order, `None` where no row matched.
pub fn assemble_by_id<T: Entity>(
    keys: &[T::Id],
    rows: Vec<T>,
) -> Vec<Result<Option<T>, LoadError>> {
    let by_id: HashMap<T::Id, T> = rows.into_iter().map(|row| (row.id(), row)).collect();
    keys.iter().map(|key| Ok(by_id.get(key).cloned())).collect()
}

/// Groups `rows` by parent key, keeping their order, and answers every key with its group.
pub fn group_by_parent<K, T>(
    keys: &[K],
    rows: Vec<T>,
    parent_key: fn(&T) -> K,
) -> Vec<Result<Vec<T>, LoadError>>
where
    K: Hash + Eq,
    T: Clone,
{
    let mut groups: HashMap<K, Vec<T>> = HashMap::with_capacity(keys.len());
    for row in rows {
        groups.entry(parent_key(&row)).or_default().push(row);
    }
    keys.iter()
        .map(|key| Ok(groups.get(key).cloned().unwrap_or_default()))
        .collect()
}

/// Loads entities by primary key. A missing row resolves to `None`.
pub struct EntityById<T: Entity> {
    fetch: FetchRows<T::Id, T>,
}

impl<T: Entity> EntityById<T> {
    pub fn new(fetch: FetchRows<T::Id, T>) -> Self {
        Self { fetch }
    }
}

impl<T: Entity> BatchFn for EntityById<T> {
    type K = T::Id;
    type V = Option<T>;

    fn load_batch(
        &self,
        keys: Vec<Self::K>,
    ) -> impl Future<Output = BatchResult<Self::V>> + Send + 'static {
        let rows = (self.fetch)(keys.clone());
        async move {
            let rows = rows.await?;
            tracing::debug!(
                entity = T::NAME,
                requested = keys.len(),
                found = rows.len(),
                "loaded entities"
            );
            Ok(assemble_by_id(&keys, rows))
        }
    }
}

impl<T: Entity> DataLoader<EntityById<T>> {
    /// Loads a row that the schema guarantees to exist; absence is an error.
    pub fn load_required(
        &self,
        id: T::Id,
    ) -> impl Future<Output = Result<T, LoadError>> + Send + use<T> {
        let deferred = self.load(id.clone());
        async move {
            deferred.await?.ok_or_else(|| LoadError::NotFound {
                entity: T::NAME,
                id: format!("{id:?}"),
            })
        }
    }

    /// Seeds the cache with a row fetched through some other query.
    pub fn prime_entity(&self, row: T) {
        self.prime(row.id(), Some(row));
    }
}

/// Loads one-to-many children grouped by a foreign key. A parent without children gets `[]`.
pub struct ChildCollection<K, T> {
    fetch: FetchRows<K, T>,
    parent_key: fn(&T) -> K,
}

impl<K, T> ChildCollection<K, T> {
    pub fn new(fetch: FetchRows<K, T>, parent_key: fn(&T) -> K) -> Self {
        Self { fetch, parent_key }
    }
}

impl<K, T> BatchFn for ChildCollection<K, T>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    type K = K;
    type V = Vec<T>;

    fn load_batch(
        &self,
        keys: Vec<Self::K>,
    ) -> impl Future<Output = BatchResult<Self::V>> + Send + 'static {
        let rows = (self.fetch)(keys.clone());
        let parent_key = self.parent_key;
        async move {
            let rows = rows.await?;
            Ok(group_by_parent(&keys, rows, parent_key))
        }
    }
}

/// Named task lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskList {
    /// The newest public tasks.
    Latest,
}

pub struct TasksByTypes {
    store: Arc<dyn Store>,
}

impl BatchFn for TasksByTypes {
    type K = TaskList;
    type V = Vec<Task>;

    fn load_batch(
        &self,
        keys: Vec<Self::K>,
    ) -> impl Future<Output = BatchResult<Self::V>> + Send + 'static {
        let store = self.store.clone();
        async move {
            let mut lists = Vec::with_capacity(keys.len());
            // One query per list kind; a failing kind only fails its own key.
            for key in keys {
                let list = match key {
                    TaskList::Latest => store.latest_tasks(LATEST_TASKS_LIMIT).await,
                };
                lists.push(list);
            }
            Ok(lists)
        }
    }
}

pub fn users_by_id(store: Arc<dyn Store>) -> DataLoader<EntityById<User>> {
    DataLoader::new(EntityById::new(Arc::new(move |ids: Vec<i32>| {
        let store = store.clone();
        async move { store.users_by_ids(&ids).await }.boxed()
    })))
}

pub fn tasks_by_id(store: Arc<dyn Store>) -> DataLoader<EntityById<Task>> {
    DataLoader::new(EntityById::new(Arc::new(move |ids: Vec<i32>| {
        let store = store.clone();
        async move { store.tasks_by_ids(&ids).await }.boxed()
    })))
}

pub fn tasks_by_types(store: Arc<dyn Store>) -> DataLoader<TasksByTypes> {
    DataLoader::new(TasksByTypes { store })
}

pub fn approach_lists(store: Arc<dyn Store>) -> DataLoader<ChildCollection<i32, Approach>> {
    DataLoader::new(ChildCollection::new(
        Arc::new(move |task_ids: Vec<i32>| {
            let store = store.clone();
            async move { store.approaches_by_task_ids(&task_ids).await }.boxed()
        }),
        |approach: &Approach| approach.task_id,
    ))
}
