use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use serde::Serialize;

use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated account a request acts for. Passed explicitly to every
/// service and hook call; created at sign-in, gone after sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountContext {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

impl AccountContext {
    /// Whether this account may mutate a record owned by `owner_id`.
    pub fn owns(&self, owner_id: &str) -> bool {
        self.id == owner_id
    }
}

/// The raw session token presented with a request.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Extractor that requires a session token, from the session cookie or an
/// `Authorization: Bearer` header. Returns 401 when neither is present.
impl FromRequestParts<AppState> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        extract_bearer_token(parts)
            .or_else(|| extract_cookie(parts, &state.config.auth.cookie_name))
            .map(|t| SessionToken(t.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
impl FromRequestParts<AppState> for AccountContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = SessionToken::from_request_parts(parts, state).await?;
        session::lookup_session(&state.db, &token)?.ok_or(AppError::Unauthorized)
    }
}

/// Optional account extractor. Yields `None` instead of a 401.
pub struct MaybeAccount(pub Option<AccountContext>);

impl FromRequestParts<AppState> for MaybeAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AccountContext::from_request_parts(parts, state).await {
            Ok(account) => Ok(MaybeAccount(Some(account))),
            Err(AppError::Unauthorized) => Ok(MaybeAccount(None)),
            Err(e) => Err(e),
        }
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn extract_cookie<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
