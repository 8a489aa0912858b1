use std::cmp::Reverse;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
#[cfg(test)]
use parking_lot::Mutex;

use super::Store;
use crate::datamodel::{Approach, Task, User};
use crate::error::LoadError;

/// A bulk fetch that reached the store, as recorded by [`MemoryStore`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    UsersByIds(Vec<i32>),
    TasksByIds(Vec<i32>),
    LatestTasks(i64),
    ApproachesByTaskIds(Vec<i32>),
}

/// In-process store over a fixed dataset.
///
/// Serves the API when no database is configured. Under test it also records every round trip
/// and can be switched offline.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Vec<User>,
    tasks: Vec<Task>,
    approaches: Vec<Approach>,
    #[cfg(test)]
    fetches: Mutex<Vec<Fetch>>,
    #[cfg(test)]
    offline: AtomicBool,
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap_or_default()
}

impl MemoryStore {
    pub fn new(users: Vec<User>, tasks: Vec<Task>, approaches: Vec<Approach>) -> Self {
        Self {
            users,
            tasks,
            approaches,
            ..Default::default()
        }
    }

    pub fn seeded() -> Self {
        let user = |id, username: &str, first: Option<&str>, last: Option<&str>| User {
            id,
            username: username.into(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
        };
        let task = |id, content: &str, tags: &str, user_id, is_private, approach_count, day| Task {
            id,
            content: content.into(),
            tags: tags.into(),
            user_id,
            is_private,
            approach_count,
            created_at: at(day, 10),
        };
        let approach = |id, task_id, user_id, content: &str, vote_count, day| Approach {
            id,
            content: content.into(),
            user_id,
            task_id,
            vote_count,
            created_at: at(day, 12),
        };

        Self::new(
            vec![
                user(1, "test", Some("Test"), Some("User")),
                user(2, "alice", Some("Alice"), None),
                user(3, "bob", None, None),
            ],
            vec![
                task(
                    1,
                    "Make an image in HTML change based on the theme color mode (dark or light)",
                    "code,html",
                    1,
                    false,
                    1,
                    1,
                ),
                task(
                    2,
                    "Get rid of only the unstaged changes since the last git commit",
                    "command,git",
                    1,
                    false,
                    1,
                    2,
                ),
                task(
                    3,
                    "The syntax for a switch statement (AKA case statement) in JavaScript",
                    "code,javascript",
                    2,
                    false,
                    1,
                    3,
                ),
                task(
                    4,
                    "Calculate the sum of numbers in a JavaScript array",
                    "code,javascript",
                    3,
                    false,
                    2,
                    4,
                ),
                task(5, "Plan the private retrospective", "note", 2, true, 0, 5),
            ],
            vec![
                approach(
                    1,
                    1,
                    1,
                    "<picture> <source srcset=\"dark.png\" media=\"(prefers-color-scheme: dark)\"> <img src=\"light.png\"> </picture>",
                    0,
                    1,
                ),
                approach(2, 2, 1, "git diff | git apply --reverse", 0, 2),
                approach(
                    3,
                    3,
                    2,
                    "switch (expression) { case value1: break; default: }",
                    0,
                    3,
                ),
                approach(4, 4, 3, "let sum = 0; for (const n of numbers) { sum += n; }", 2, 4),
                approach(5, 4, 2, "numbers.reduce((acc, n) => acc + n, 0)", 5, 5),
            ],
        )
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Every fetch served so far, oldest first.
    pub fn fetches(&self) -> Vec<Fetch> {
        self.fetches.lock().clone()
    }

    /// While offline, every fetch fails with [`LoadError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn record(&self, fetch: Fetch) -> Result<(), LoadError> {
        self.fetches.lock().push(fetch);
        if self.offline.load(Ordering::SeqCst) {
            return Err(LoadError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>, LoadError> {
        #[cfg(test)]
        self.record(Fetch::UsersByIds(ids.to_vec()))?;
        Ok(self
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn tasks_by_ids(&self, ids: &[i32]) -> Result<Vec<Task>, LoadError> {
        #[cfg(test)]
        self.record(Fetch::TasksByIds(ids.to_vec()))?;
        Ok(self
            .tasks
            .iter()
            .filter(|t| !t.is_private && ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn latest_tasks(&self, limit: i64) -> Result<Vec<Task>, LoadError> {
        #[cfg(test)]
        self.record(Fetch::LatestTasks(limit))?;
        let mut tasks: Vec<Task> = self.tasks.iter().filter(|t| !t.is_private).cloned().collect();
        tasks.sort_by_key(|t| Reverse(t.created_at));
        tasks.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(tasks)
    }

    async fn approaches_by_task_ids(&self, task_ids: &[i32]) -> Result<Vec<Approach>, LoadError> {
        #[cfg(test)]
        self.record(Fetch::ApproachesByTaskIds(task_ids.to_vec()))?;
        let mut approaches: Vec<Approach> = self
            .approaches
            .iter()
            .filter(|a| task_ids.contains(&a.task_id))
            .cloned()
            .collect();
        approaches.sort_by_key(|a| (Reverse(a.vote_count), Reverse(a.created_at)));
        Ok(approaches)
    }
}
