use cynic::http::ReqwestExt;
use cynic::serde;
use reqwest::Url;

/// Typed GraphQL client for the azdev API.
pub struct Client {
    client: reqwest::Client,
    url: Url,
}

impl Client {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    pub async fn query<Query, Input>(
        &self,
        op: cynic::Operation<Query, Input>,
    ) -> cynic::GraphQlResponse<Query>
    where
        Input: serde::Serialize,
        Query: serde::de::DeserializeOwned + 'static,
    {
        self.client
            .post(self.url.clone())
            .run_graphql(op)
            .await
            .unwrap()
    }
}

#[cynic::schema("azdev")]
mod schema {}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Query")]
pub struct TaskMainList {
    pub task_main_list: Vec<Task>,
}

#[derive(cynic::QueryFragment, Debug)]
pub struct Task {
    pub id: cynic::Id,
    pub content: String,
    pub tags: Vec<String>,
    pub approach_count: i32,
    pub created_at: String,
    pub author: User,
    pub approach_list: Vec<Approach>,
}

#[derive(cynic::QueryFragment, Debug)]
pub struct User {
    pub id: cynic::Id,
    pub username: String,
    pub name: Option<String>,
}

#[derive(cynic::QueryFragment, Debug)]
pub struct Approach {
    pub id: cynic::Id,
    pub content: String,
    pub vote_count: i32,
    pub author: User,
    pub task: TaskRef,
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Task")]
pub struct TaskRef {
    pub id: cynic::Id,
}

#[derive(cynic::QueryVariables, Debug)]
pub struct TaskInfoArguments {
    pub id: cynic::Id,
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Query", variables = "TaskInfoArguments")]
pub struct TaskInfo {
    #[arguments(id: $id)]
    pub task_info: Option<TaskWithAuthor>,
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Task")]
pub struct TaskWithAuthor {
    pub id: cynic::Id,
    pub content: String,
    pub author: User,
}

#[derive(cynic::QueryVariables, Debug)]
pub struct TasksByIdsArguments {
    pub ids: Vec<cynic::Id>,
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Query", variables = "TasksByIdsArguments")]
pub struct TasksByIds {
    #[arguments(ids: $ids)]
    pub tasks_by_ids: Vec<Option<TaskWithAuthor>>,
}

#[derive(cynic::QueryVariables, Debug)]
pub struct NumbersInRangeArguments {
    pub begin: i32,
    pub end: i32,
}

#[derive(cynic::QueryFragment, Debug)]
#[cynic(graphql_type = "Query", variables = "NumbersInRangeArguments")]
pub struct NumbersInRangeQuery {
    #[arguments(begin: $begin, end: $end)]
    pub numbers_in_range: NumbersInRange,
}

#[derive(cynic::QueryFragment, Debug)]
pub struct NumbersInRange {
    pub sum: i32,
    pub count: i32,
}
