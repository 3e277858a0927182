use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::db::models::Note;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::hooks::{MutationCallbacks, NoteHook};
use crate::listing::ListQuery;
use crate::services::notes::{NewNote, NotePatch};
use crate::services::Removal;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notes", get(list).post(create))
        .route("/api/notes/{id}", patch(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    account: AccountContext,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Note>>> {
    let notes = NoteHook::new(&state, &account).notes().await?;
    Ok(Json(query.apply(&notes)))
}

async fn create(
    State(state): State<AppState>,
    account: AccountContext,
    Json(input): Json<NewNote>,
) -> AppResult<Json<Note>> {
    let note = NoteHook::new(&state, &account)
        .create(input, MutationCallbacks::none())
        .await?;
    Ok(Json(note))
}

async fn update(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
    Json(patch): Json<NotePatch>,
) -> AppResult<Json<Note>> {
    let note = NoteHook::new(&state, &account)
        .update(&id, patch, MutationCallbacks::none())
        .await?;
    Ok(Json(note))
}

async fn remove(
    State(state): State<AppState>,
    account: AccountContext,
    Path(id): Path<String>,
) -> AppResult<Json<Removal>> {
    let removal = NoteHook::new(&state, &account)
        .delete(&id, MutationCallbacks::none())
        .await?;
    Ok(Json(removal))
}
