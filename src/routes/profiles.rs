use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::AccountProfile;
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::hooks::{MutationCallbacks, ProfileHook};
use crate::services::profiles::ProfilePatch;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProfileIds {
    /// Comma-separated account ids.
    #[serde(default)]
    pub ids: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(own).patch(update))
        .route("/api/profiles", get(many))
}

async fn own(
    State(state): State<AppState>,
    account: AccountContext,
) -> AppResult<Json<AccountProfile>> {
    let profile = ProfileHook::new(&state, &account).profile().await?;
    let profile = Option::clone(&profile).ok_or(AppError::NotFound)?;
    Ok(Json(profile))
}

async fn update(
    State(state): State<AppState>,
    account: AccountContext,
    Json(patch): Json<ProfilePatch>,
) -> AppResult<Json<AccountProfile>> {
    let profile = ProfileHook::new(&state, &account)
        .update(patch, MutationCallbacks::none())
        .await?;
    Ok(Json(profile))
}

async fn many(
    State(state): State<AppState>,
    account: AccountContext,
    Query(params): Query<ProfileIds>,
) -> AppResult<Json<Vec<AccountProfile>>> {
    let ids: Vec<String> = params
        .ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    let profiles = ProfileHook::new(&state, &account).profiles(&ids).await?;
    Ok(Json(profiles.to_vec()))
}
