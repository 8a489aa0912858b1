//! Non-null relations are loaded up front by the resolver that owns the nearest nullable
//! position, so that a dangling reference can null out that position instead of leaving a
//! non-null field unset.

use async_graphql::{Context, Lookahead, PathSegment, ServerError};
use futures::future::{BoxFuture, try_join_all};
use futures::{FutureExt, TryFutureExt};

use crate::datamodel::{Approach, Task};
use crate::error::LoadError;

use super::context::RequestContext;

/// The non-null relations a query selects below a `Task`.
#[derive(Debug, Default)]
pub struct TaskSelection {
    author: bool,
    approach_list: Option<ApproachSelection>,
}

#[derive(Debug, Default)]
struct ApproachSelection {
    author: bool,
    task: Option<Box<TaskSelection>>,
}

impl TaskSelection {
    /// Reads the selection set of a field whose type is `Task`, `[Task]` or similar.
    pub fn of(task: &Lookahead<'_>) -> Self {
        let approaches = task.field("approachList");
        Self {
            author: task.field("author").exists(),
            approach_list: approaches.exists().then(|| {
                let task = approaches.field("task");
                ApproachSelection {
                    author: approaches.field("author").exists(),
                    task: task.exists().then(|| Box::new(Self::of(&task))),
                }
            }),
        }
    }
}

/// A required relation that could not be loaded, with its path below the checked value.
#[derive(Debug)]
pub struct MissingRelation {
    /// Innermost segment first.
    path: Vec<PathSegment>,
    pub error: LoadError,
}

impl MissingRelation {
    fn new(field: &str, error: LoadError) -> Self {
        Self {
            path: vec![PathSegment::Field(field.to_owned())],
            error,
        }
    }

    fn under(mut self, segment: PathSegment) -> Self {
        self.path.push(segment);
        self
    }

    pub fn at_index(self, index: usize) -> Self {
        self.under(PathSegment::Index(index))
    }

    /// The error to report for the current (root) field.
    pub fn into_server_error(self, ctx: &Context<'_>) -> ServerError {
        let mut err = ServerError::new(self.error.to_string(), Some(ctx.item.pos));
        err.path
            .push(PathSegment::Field(ctx.item.node.response_key().node.to_string()));
        err.path.extend(self.path.into_iter().rev());
        err
    }
}

impl RequestContext {
    /// Loads every non-null relation of `task` that `selection` asks for.
    ///
    /// All loads of one level are registered before the first await, so checking a list of
    /// tasks concurrently costs one batch per loader and level. The resolvers that run
    /// afterwards find everything in the cache.
    pub fn check_task<'a>(
        &'a self,
        task: &'a Task,
        selection: &'a TaskSelection,
    ) -> BoxFuture<'a, Result<(), MissingRelation>> {
        let author = selection
            .author
            .then(|| self.users_by_id.load_required(task.user_id));
        let approaches = selection
            .approach_list
            .as_ref()
            .map(|selection| (selection, self.approach_lists.load(task.id)));

        async move {
            if let Some(author) = author {
                author
                    .await
                    .map_err(|error| MissingRelation::new("author", error))?;
            }
            if let Some((selection, approaches)) = approaches {
                let approaches = approaches
                    .await
                    .map_err(|error| MissingRelation::new("approachList", error))?;
                let checks = approaches.iter().enumerate().map(|(index, approach)| {
                    self.check_approach(approach, selection).map_err(move |missing| {
                        missing
                            .at_index(index)
                            .under(PathSegment::Field("approachList".to_owned()))
                    })
                });
                try_join_all(checks).await?;
            }
            Ok(())
        }
        .boxed()
    }

    fn check_approach<'a>(
        &'a self,
        approach: &'a Approach,
        selection: &'a ApproachSelection,
    ) -> BoxFuture<'a, Result<(), MissingRelation>> {
        let author = selection
            .author
            .then(|| self.users_by_id.load_required(approach.user_id));
        let task = selection
            .task
            .as_deref()
            .map(|selection| (selection, self.tasks_by_id.load_required(approach.task_id)));

        async move {
            if let Some(author) = author {
                author
                    .await
                    .map_err(|error| MissingRelation::new("author", error))?;
            }
            if let Some((selection, task)) = task {
                let task = task
                    .await
                    .map_err(|error| MissingRelation::new("task", error))?;
                self.check_task(&task, selection)
                    .await
                    .map_err(|missing| missing.under(PathSegment::Field("task".to_owned())))?;
            }
            Ok(())
        }
        .boxed()
    }
}
