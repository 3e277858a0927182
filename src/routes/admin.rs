use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::hooks::{AccountHook, MutationCallbacks};
use crate::services::accounts::AccountDeletion;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DeleteAccountForm {
    #[serde(default, alias = "userId")]
    pub user_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/delete-account", post(delete_account))
}

async fn delete_account(
    State(state): State<AppState>,
    account: AccountContext,
    Json(form): Json<DeleteAccountForm>,
) -> AppResult<Json<AccountDeletion>> {
    let deleted = AccountHook::new(&state, &account)
        .delete_account(&form.user_id, MutationCallbacks::none())
        .await?;
    Ok(Json(deleted))
}
