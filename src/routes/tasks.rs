use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::db::models::Task;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::hooks::{MutationCallbacks, TaskHook};
use crate::listing::ListQuery;
use crate::services::tasks::{NewTask, TaskPatch};
use crate::services::Removal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list).post(create))
        .route("/api/tasks/{id}", patch(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    account: AccountContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = TaskHook::new(&state, &account).tasks().await?;
    Ok(Json(query.apply(&tasks)))
}

async fn create(
    State(state): State<AppState>,
    account: AccountContext,
    Json(input): Json<NewTask>,
) -> AppResult<Json<Task>> {
    let task = TaskHook::new(&state, &account)
        .create(input, MutationCallbacks::none())
        .await?;
    Ok(Json(task))
}

async fn update(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> AppResult<Json<Task>> {
    let task = TaskHook::new(&state, &account)
        .update(&id, patch, MutationCallbacks::none())
        .await?;
    Ok(Json(task))
}

async fn remove(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
) -> AppResult<Json<Removal>> {
    let removal = TaskHook::new(&state, &account)
        .delete(&id, MutationCallbacks::none())
        .await?;
    Ok(Json(removal))
}
