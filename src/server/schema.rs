use async_graphql::{Context, ID, Object, Result, SimpleObject};
use futures::future::{join_all, try_join_all};

use crate::datamodel::{Approach, Task, User, iso_timestamp};
use crate::range::{self, RangeSummary};

use super::context::ContextExt;
use super::loaders::TaskList;
use super::relations::TaskSelection;

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn username(&self) -> &str {
        &self.username
    }

    async fn name(&self) -> Option<String> {
        Some(self.display_name())
    }
}

#[Object]
impl Task {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn content(&self) -> &str {
        &self.content
    }

    async fn tags(&self) -> Vec<String> {
        self.tag_list()
    }

    async fn approach_count(&self) -> i32 {
        self.approach_count
    }

    async fn created_at(&self) -> String {
        iso_timestamp(&self.created_at)
    }

    async fn author(&self, ctx: &Context<'_>) -> Result<User> {
        Ok(ctx.loaders()?.users_by_id.load_required(self.user_id).await?)
    }

    async fn approach_list(&self, ctx: &Context<'_>) -> Result<Vec<Approach>> {
        Ok(ctx.loaders()?.approach_lists.load(self.id).await?)
    }
}

#[Object]
impl Approach {
    async fn id(&self) -> ID {
        ID(self.id.to_string())
    }

    async fn content(&self) -> &str {
        &self.content
    }

    async fn vote_count(&self) -> i32 {
        self.vote_count
    }

    async fn created_at(&self) -> String {
        iso_timestamp(&self.created_at)
    }

    async fn author(&self, ctx: &Context<'_>) -> Result<User> {
        Ok(ctx.loaders()?.users_by_id.load_required(self.user_id).await?)
    }

    async fn task(&self, ctx: &Context<'_>) -> Result<Task> {
        Ok(ctx.loaders()?.tasks_by_id.load_required(self.task_id).await?)
    }
}

/// Aggregate info on a range of numbers
#[derive(SimpleObject)]
pub struct NumbersInRange {
    sum: i32,
    count: i32,
}

impl From<RangeSummary> for NumbersInRange {
    fn from(RangeSummary { sum, count }: RangeSummary) -> Self {
        Self { sum, count }
    }
}

fn parse_task_id(id: &ID) -> Result<i32> {
    id.0
        .parse()
        .map_err(|_| format!("Invalid task id `{}`", id.0).into())
}

pub struct RootQuery;

/// The entry point of the API
#[Object(name = "Query")]
impl RootQuery {
    /// Current UTC time as `HH:MM:SS`
    async fn current_time(&self) -> String {
        chrono::Utc::now().format("%H:%M:%S").to_string()
    }

    async fn numbers_in_range(&self, begin: i32, end: i32) -> Result<NumbersInRange> {
        Ok(range::numbers_in_range(begin, end)?.into())
    }

    /// The latest public tasks, newest first
    async fn task_main_list(&self, ctx: &Context<'_>) -> Result<Vec<Task>> {
        let loaders = ctx.loaders()?;
        let tasks = loaders.tasks_by_types.load(TaskList::Latest).await?;
        for task in &tasks {
            loaders.tasks_by_id.prime_entity(task.clone());
        }

        // No item is nullable, so one dangling relation fails the whole list.
        let selection = TaskSelection::of(&ctx.look_ahead());
        let checks = tasks.iter().map(|task| loaders.check_task(task, &selection));
        try_join_all(checks)
            .await
            .map_err(|missing| missing.error)?;
        Ok(tasks)
    }

    /// A single public task by ID
    async fn task_info(&self, ctx: &Context<'_>, id: ID) -> Result<Option<Task>> {
        let id = parse_task_id(&id)?;
        let loaders = ctx.loaders()?;
        let Some(task) = loaders.tasks_by_id.load(id).await? else {
            return Ok(None);
        };

        let selection = TaskSelection::of(&ctx.look_ahead());
        match loaders.check_task(&task, &selection).await {
            Ok(()) => Ok(Some(task)),
            Err(missing) => {
                ctx.add_error(missing.into_server_error(ctx));
                Ok(None)
            }
        }
    }

    /// Several public tasks by ID, in the requested order; unknown IDs yield `null`
    async fn tasks_by_ids(&self, ctx: &Context<'_>, ids: Vec<ID>) -> Result<Vec<Option<Task>>> {
        let ids = ids.iter().map(parse_task_id).collect::<Result<Vec<_>>>()?;
        let loaders = ctx.loaders()?;
        let tasks = try_join_all(loaders.tasks_by_id.load_many(ids)).await?;

        let selection = TaskSelection::of(&ctx.look_ahead());
        let checked = tasks.into_iter().enumerate().map(|(index, task)| {
            let selection = &selection;
            async move {
                let Some(task) = task else {
                    return None;
                };
                match loaders.check_task(&task, selection).await {
                    Ok(()) => Some(task),
                    Err(missing) => {
                        ctx.add_error(missing.at_index(index).into_server_error(ctx));
                        None
                    }
                }
            }
        });
        Ok(join_all(checked).await)
    }
}
