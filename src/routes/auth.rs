use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::{self, SignedIn};
use crate::config::AuthConfig;
use crate::error::AppResult;
use crate::extractors::{AccountContext, MaybeAccount, SessionToken};
use crate::hooks::{AccountHook, MutationCallbacks};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/session", get(session))
}

fn session_cookie(auth: &AuthConfig, token: &str) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        auth.cookie_name,
        token,
        auth.session_hours * 3600
    )
}

fn cleared_cookie(auth: &AuthConfig) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", auth.cookie_name)
}

fn signed_in(auth: &AuthConfig, signed: SignedIn) -> Response {
    let cookie = session_cookie(auth, &signed.token);
    ([(header::SET_COOKIE, cookie)], Json(signed)).into_response()
}

async fn sign_up(
    State(state): State<AppState>,
    Json(form): Json<SignUpForm>,
) -> AppResult<Response> {
    let signed = auth::sign_up(
        &state.db,
        &state.config.auth,
        &form.email,
        &form.password,
        form.display_name.as_deref(),
    )?;
    tracing::info!(account = %signed.account.id, "Account created");
    Ok(signed_in(&state.config.auth, signed))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(form): Json<SignInForm>,
) -> AppResult<Response> {
    let signed = auth::sign_in(&state.db, &state.config.auth, &form.email, &form.password)?;
    tracing::info!(account = %signed.account.id, "Signed in");
    Ok(signed_in(&state.config.auth, signed))
}

async fn sign_out(
    State(state): State<AppState>,
    account: AccountContext,
    SessionToken(token): SessionToken,
) -> AppResult<Response> {
    AccountHook::new(&state, &account)
        .sign_out(&token, MutationCallbacks::none())
        .await?;
    tracing::info!(account = %account.id, "Signed out");
    let cookie = cleared_cookie(&state.config.auth);
    Ok(([(header::SET_COOKIE, cookie)], Json(serde_json::json!({ "ok": true }))).into_response())
}

async fn session(MaybeAccount(account): MaybeAccount) -> Json<Option<AccountContext>> {
    Json(account)
}
