use std::sync::Arc;

use async_graphql::{PathSegment, value};
use chrono::NaiveDateTime;
use cynic::QueryBuilder as _;

use crate::client::{
    NumbersInRangeArguments, NumbersInRangeQuery, TaskInfo, TaskInfoArguments, TaskMainList,
    TasksByIds, TasksByIdsArguments,
};
use crate::datamodel::{Approach, Task, User};
use crate::server::{RequestContext, build_schema};
use crate::store::{Fetch, MemoryStore};


use testserver::Server;

#[tokio::test]
async fn test_task_main_list_batches_every_level() {
    let store = Arc::new(MemoryStore::seeded());
    let server = Server::start(store.clone()).await;

    let res = server.client().query(TaskMainList::build(())).await;
    assert!(res.errors.is_none(), "{:?}", res.errors);
    let tasks = res.data.unwrap().task_main_list;

    let ids: Vec<&str> = tasks.iter().map(|t| t.id.inner()).collect();
    assert_eq!(ids, ["4", "3", "2", "1"]);

    let newest = &tasks[0];
    assert_eq!(newest.tags, ["code", "javascript"]);
    assert_eq!(newest.approach_count, 2);
    assert_eq!(newest.created_at, "2026-01-04T10:00:00.000Z");
    assert_eq!(newest.author.username, "bob");
    assert_eq!(newest.author.name.as_deref(), Some(""));

    let approaches: Vec<(&str, &str, &str)> = newest
        .approach_list
        .iter()
        .map(|a| (a.id.inner(), a.author.username.as_str(), a.task.id.inner()))
        .collect();
    assert_eq!(approaches, [("5", "alice", "4"), ("4", "bob", "4")]);
    assert_eq!(tasks[3].author.name.as_deref(), Some("Test User"));

    // One round trip per loader; approach authors and tasks come from the cache.
    let fetches = store.fetches();
    assert_eq!(fetches.len(), 3, "{fetches:?}");
    assert_eq!(fetches[0], Fetch::LatestTasks(100));
    assert!(fetches.contains(&Fetch::UsersByIds(vec![3, 2, 1])));
    assert!(fetches.contains(&Fetch::ApproachesByTaskIds(vec![4, 3, 2, 1])));
}

#[tokio::test]
async fn test_caches_do_not_outlive_a_request() {
    let store = Arc::new(MemoryStore::seeded());
    let server = Server::start(store.clone()).await;
    let client = server.client();

    for _ in 0..2 {
        let res = client
            .query(TaskInfo::build(TaskInfoArguments {
                id: cynic::Id::new("2"),
            }))
            .await;
        let task = res.data.unwrap().task_info.unwrap();
        assert_eq!(task.author.name.as_deref(), Some("Test User"));
    }

    assert_eq!(
        store.fetches(),
        [
            Fetch::TasksByIds(vec![2]),
            Fetch::UsersByIds(vec![1]),
            Fetch::TasksByIds(vec![2]),
            Fetch::UsersByIds(vec![1]),
        ]
    );
}

#[tokio::test]
async fn test_task_info_not_found_and_invalid_id() {
    let server = Server::start(Arc::new(MemoryStore::seeded())).await;
    let client = server.client();

    // Task 5 is private.
    for id in ["5", "404"] {
        let res = client
            .query(TaskInfo::build(TaskInfoArguments {
                id: cynic::Id::new(id),
            }))
            .await;
        assert!(res.errors.is_none());
        assert!(res.data.unwrap().task_info.is_none());
    }

    let res = client
        .query(TaskInfo::build(TaskInfoArguments {
            id: cynic::Id::new("abc"),
        }))
        .await;
    let errors = res.errors.unwrap();
    assert_eq!(errors[0].message, "Invalid task id `abc`");
}

#[tokio::test]
async fn test_tasks_by_ids_dedupes_and_keeps_positions() {
    let store = Arc::new(MemoryStore::seeded());
    let server = Server::start(store.clone()).await;

    let res = server
        .client()
        .query(TasksByIds::build(TasksByIdsArguments {
            ids: vec![
                cynic::Id::new("3"),
                cynic::Id::new("99"),
                cynic::Id::new("3"),
            ],
        }))
        .await;
    let tasks = res.data.unwrap().tasks_by_ids;

    let ids: Vec<Option<&str>> = tasks
        .iter()
        .map(|t| t.as_ref().map(|t| t.id.inner()))
        .collect();
    assert_eq!(ids, [Some("3"), None, Some("3")]);
    assert_eq!(
        store.fetches(),
        [Fetch::TasksByIds(vec![3, 99]), Fetch::UsersByIds(vec![2])]
    );
}

/// User 1 plus the given `(id, user_id)` tasks and `(id, task_id, user_id)` approaches.
fn store_with(tasks: &[(i32, i32)], approaches: &[(i32, i32, i32)]) -> MemoryStore {
    let at = NaiveDateTime::default();
    let user = User {
        id: 1,
        username: "test".into(),
        first_name: None,
        last_name: None,
    };
    let tasks = tasks
        .iter()
        .map(|&(id, user_id)| Task {
            id,
            content: format!("task {id}"),
            tags: String::new(),
            user_id,
            is_private: false,
            approach_count: 0,
            created_at: at,
        })
        .collect();
    let approaches = approaches
        .iter()
        .map(|&(id, task_id, user_id)| Approach {
            id,
            content: format!("approach {id}"),
            user_id,
            task_id,
            vote_count: 0,
            created_at: at,
        })
        .collect();
    MemoryStore::new(vec![user], tasks, approaches)
}

async fn execute(store: Arc<MemoryStore>, query: &str) -> async_graphql::Response {
    let loaders = RequestContext::new(store);
    let req = async_graphql::Request::new(query).data(loaders.clone());
    loaders.run(build_schema().execute(req)).await
}

fn field(name: &str) -> PathSegment {
    PathSegment::Field(name.into())
}

#[tokio::test]
async fn test_missing_required_author_fails_only_its_item() {
    let store = store_with(&[(1, 1), (2, 42)], &[]);
    let server = Server::start(Arc::new(store)).await;

    let res = server
        .client()
        .query(TasksByIds::build(TasksByIdsArguments {
            ids: vec![cynic::Id::new("1"), cynic::Id::new("2")],
        }))
        .await;

    let errors = res.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "User not found: 42");

    let tasks = res.data.unwrap().tasks_by_ids;
    assert_eq!(tasks[0].as_ref().unwrap().author.username, "test");
    assert!(tasks[1].is_none());
}

#[tokio::test]
async fn test_task_info_with_missing_author_is_null() {
    let store = Arc::new(store_with(&[(2, 42)], &[]));
    let res = execute(store, r#"{ taskInfo(id: "2") { id author { username } } }"#).await;

    assert_eq!(res.data, value!({ "taskInfo": null }));
    assert_eq!(res.errors.len(), 1);
    assert_eq!(res.errors[0].message, "User not found: 42");
    assert_eq!(res.errors[0].path, [field("taskInfo"), field("author")]);
}

#[tokio::test]
async fn test_missing_approach_author_nulls_the_owning_task() {
    let store = Arc::new(store_with(&[(1, 1), (2, 1)], &[(7, 2, 42)]));
    let res = execute(
        store.clone(),
        r#"{ tasksByIds(ids: ["1", "2"]) { id approachList { id author { username } } } }"#,
    )
    .await;

    assert_eq!(
        res.data,
        value!({ "tasksByIds": [{ "id": "1", "approachList": [] }, null] })
    );
    assert_eq!(res.errors.len(), 1);
    assert_eq!(
        res.errors[0].path,
        [
            field("tasksByIds"),
            PathSegment::Index(1),
            field("approachList"),
            PathSegment::Index(0),
            field("author"),
        ]
    );
    assert_eq!(
        store.fetches(),
        [
            Fetch::TasksByIds(vec![1, 2]),
            Fetch::ApproachesByTaskIds(vec![1, 2]),
            Fetch::UsersByIds(vec![42]),
        ]
    );
}

#[tokio::test]
async fn test_missing_author_fails_the_whole_main_list() {
    let store = Arc::new(store_with(&[(1, 1), (2, 42)], &[]));
    let res = execute(store, "{ taskMainList { id author { username } } }").await;

    assert_eq!(res.data, async_graphql::Value::Null);
    assert_eq!(res.errors.len(), 1);
    assert_eq!(res.errors[0].message, "User not found: 42");
}

#[tokio::test]
async fn test_store_outage_surfaces_as_graphql_error() {
    let store = Arc::new(MemoryStore::seeded());
    store.set_offline(true);
    let server = Server::start(store).await;

    let res = server.client().query(TaskMainList::build(())).await;
    assert!(res.data.is_none());
    assert_eq!(res.errors.unwrap()[0].message, "backing store unavailable");
}

#[tokio::test]
async fn test_numbers_in_range() {
    let server = Server::start(Arc::new(MemoryStore::seeded())).await;
    let client = server.client();

    let res = client
        .query(NumbersInRangeQuery::build(NumbersInRangeArguments {
            begin: 2,
            end: 5,
        }))
        .await;
    let summary = res.data.unwrap().numbers_in_range;
    assert_eq!((summary.sum, summary.count), (14, 4));

    let res = client
        .query(NumbersInRangeQuery::build(NumbersInRangeArguments {
            begin: 5,
            end: 2,
        }))
        .await;
    assert!(res.data.is_none());
    assert_eq!(
        res.errors.unwrap()[0].message,
        "Invalid range because 2 < 5"
    );
}

#[test]
fn test_sdl_matches_client_schema() {
    let sdl = build_schema().sdl();
    for field in [
        "taskMainList: [Task!]!",
        "taskInfo(id: ID!): Task",
        "tasksByIds(ids: [ID!]!): [Task]!",
        "numbersInRange(begin: Int!, end: Int!): NumbersInRange!",
        "approachList: [Approach!]!",
        "author: User!",
        "name: String",
    ] {
        assert!(sdl.contains(field), "missing `{field}` in:\n{sdl}");
    }
}
