use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::db::models::{FoodComment, FoodPost};
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::hooks::{FoodCommentHook, FoodPostHook, MutationCallbacks};
use crate::listing::ListQuery;
use crate::routes::read_upload;
use crate::services::food::{self, CommentPatch, FoodPostPatch, NewComment};
use crate::services::Removal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/food", get(list_posts).post(upload_post))
        .route("/api/food/{id}", patch(update_post).delete(delete_post))
        .route(
            "/api/food/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/api/food/comments/{id}",
            patch(update_comment).delete(delete_comment),
        )
}

// --- Posts ---

async fn list_posts(
    State(state): State<AppState>,
    account: AccountContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<FoodPost>>> {
    let posts = FoodPostHook::new(&state, &account).posts().await?;
    Ok(Json(query.apply(&posts)))
}

async fn upload_post(
    State(state): State<AppState>,
    account: AccountContext,
    multipart: Multipart,
) -> AppResult<Json<FoodPost>> {
    let (file, fields) = read_upload(multipart).await?;
    let name = fields.get("name").map(String::as_str).unwrap_or_default();
    let post = FoodPostHook::new(&state, &account)
        .upload(file, name, MutationCallbacks::none())
        .await?;
    Ok(Json(post))
}

async fn update_post(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
    Json(patch): Json<FoodPostPatch>,
) -> AppResult<Json<FoodPost>> {
    let post = FoodPostHook::new(&state, &account)
        .update(&id, patch, MutationCallbacks::none())
        .await?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
) -> AppResult<Json<Removal>> {
    let removal = FoodPostHook::new(&state, &account)
        .delete(&id, MutationCallbacks::none())
        .await?;
    Ok(Json(removal))
}

// --- Comments ---

async fn list_comments(
    State(state): State<AppState>,
    account: AccountContext,
    Path(post_id): Path<String>,
) -> AppResult<Json<Vec<FoodComment>>> {
    let comments = FoodCommentHook::new(&state, &account, post_id)
        .comments()
        .await?;
    Ok(Json(comments.to_vec()))
}

async fn create_comment(
    State(state): State<AppState>,
    account: AccountContext,
    Path(post_id): Path<String>,
    Json(input): Json<NewComment>,
) -> AppResult<Json<FoodComment>> {
    let comment = FoodCommentHook::new(&state, &account, post_id)
        .create(input, MutationCallbacks::none())
        .await?;
    Ok(Json(comment))
}

/// Comment routes are addressed by comment id; scope the hook to its post.
fn comment_post(state: &AppState, id: &str) -> AppResult<String> {
    Ok(food::get_comment(&state.db, id)?.food_post_id)
}

async fn update_comment(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
    Json(patch): Json<CommentPatch>,
) -> AppResult<Json<FoodComment>> {
    let post_id = comment_post(&state, &id)?;
    let comment = FoodCommentHook::new(&state, &account, post_id)
        .update(&id, patch, MutationCallbacks::none())
        .await?;
    Ok(Json(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
) -> AppResult<Json<FoodComment>> {
    let post_id = comment_post(&state, &id)?;
    let comment = FoodCommentHook::new(&state, &account, post_id)
        .delete(&id, MutationCallbacks::none())
        .await?;
    Ok(Json(comment))
}
