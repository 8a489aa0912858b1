use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql::{EmptyMutation, EmptySubscription, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Router;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;

use crate::store::Store;

pub mod context;
pub mod dataloader;
pub mod loaders;
mod relations;
mod schema;

pub use context::RequestContext;
use schema::RootQuery;

type FullSchema = Schema<RootQuery, EmptyMutation, EmptySubscription>;

#[derive(Clone)]
struct AppState {
    schema: FullSchema,
    store: Arc<dyn Store>,
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().finish())
}

#[axum::debug_handler]
async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    // Loaders and their caches are scoped to this one request.
    let loaders = RequestContext::new(state.store.clone());
    let req = req.into_inner().data(loaders.clone());
    tracing::debug!(operation = ?req.operation_name, "executing GraphQL request");

    let res = loaders.run(state.schema.execute(req)).await;
    if res.is_err() {
        tracing::debug!(errors = res.errors.len(), "GraphQL request finished with errors");
    }
    res.into()
}

pub fn build_schema() -> FullSchema {
    Schema::build(RootQuery, EmptyMutation, EmptySubscription).finish()
}

pub fn make_app(store: Arc<dyn Store>) -> Router {
    let state = AppState {
        schema: build_schema(),
        store,
    };

    Router::new()
        .route("/", get(graphiql).post(graphql_handler))
        .with_state(state)
}
