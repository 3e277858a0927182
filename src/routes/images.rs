use axum::extract::{Multipart, Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::db::models::Image;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::hooks::{ImageHook, MutationCallbacks};
use crate::listing::ListQuery;
use crate::routes::read_upload;
use crate::services::images::ImagePatch;
use crate::services::Removal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/images", get(list).post(upload))
        .route("/api/images/{id}", patch(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    account: AccountContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Image>>> {
    let images = ImageHook::new(&state, &account).images().await?;
    Ok(Json(query.apply(&images)))
}

async fn upload(
    State(state): State<AppState>,
    account: AccountContext,
    multipart: Multipart,
) -> AppResult<Json<Image>> {
    let (file, _) = read_upload(multipart).await?;
    let image = ImageHook::new(&state, &account)
        .upload(file, MutationCallbacks::none())
        .await?;
    Ok(Json(image))
}

async fn update(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
    Json(patch): Json<ImagePatch>,
) -> AppResult<Json<Image>> {
    let image = ImageHook::new(&state, &account)
        .update(&id, patch, MutationCallbacks::none())
        .await?;
    Ok(Json(image))
}

async fn remove(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
) -> AppResult<Json<Removal>> {
    let removal = ImageHook::new(&state, &account)
        .delete(&id, MutationCallbacks::none())
        .await?;
    Ok(Json(removal))
}
