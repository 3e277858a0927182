use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::catalog::Creature;
use crate::db::models::CreatureComment;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::hooks::{
    AccountCreatureCommentsHook, CreatureCommentHook, CreatureSearchHook, MutationCallbacks,
};
use crate::listing::ListQuery;
use crate::services::creatures;
use crate::services::food::{CommentPatch, NewComment};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct CreatureCommentForm {
    pub creature_name: String,
    #[serde(flatten)]
    pub comment: NewComment,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/creatures/search", get(search))
        .route(
            "/api/creatures/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route("/api/creatures/comments/mine", get(my_comments))
        .route(
            "/api/creatures/comments/{id}",
            patch(update_comment).delete(delete_comment),
        )
}

async fn search(
    State(state): State<AppState>,
    _account: AccountContext,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Creature>> {
    let found = CreatureSearchHook::new(&state, &params.q).results().await;
    Json(found.to_vec())
}

async fn list_comments(
    State(state): State<AppState>,
    account: AccountContext,
    Path(creature_id): Path<i64>,
) -> AppResult<Json<Vec<CreatureComment>>> {
    let comments = CreatureCommentHook::new(&state, &account, creature_id)
        .comments()
        .await?;
    Ok(Json(comments.to_vec()))
}

async fn create_comment(
    State(state): State<AppState>,
    account: AccountContext,
    Path(creature_id): Path<i64>,
    Json(form): Json<CreatureCommentForm>,
) -> AppResult<Json<CreatureComment>> {
    let comment = CreatureCommentHook::new(&state, &account, creature_id)
        .create(&form.creature_name, form.comment, MutationCallbacks::none())
        .await?;
    Ok(Json(comment))
}

async fn my_comments(
    State(state): State<AppState>,
    account: AccountContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<CreatureComment>>> {
    let comments = AccountCreatureCommentsHook::new(&state, &account)
        .comments()
        .await?;
    Ok(Json(query.apply(&comments)))
}

async fn update_comment(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
    Json(patch): Json<CommentPatch>,
) -> AppResult<Json<CreatureComment>> {
    let creature_id = creatures::get_comment(&state.db, &id)?.creature_id;
    let comment = CreatureCommentHook::new(&state, &account, creature_id)
        .update(&id, patch, MutationCallbacks::none())
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
) -> AppResult<Json<CreatureComment>> {
    let creature_id = creatures::get_comment(&state.db, &id)?.creature_id;
    let comment = CreatureCommentHook::new(&state, &account, creature_id)
        .delete(&id, MutationCallbacks::none())
        .await?;
    Ok(Json(comment))
}
