use std::io::ErrorKind;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{is_safe_key, Bucket};

pub fn router() -> Router<AppState> {
    Router::new().route("/storage/{bucket}/{*key}", get(serve))
}

/// Serve a stored file by its public URL.
async fn serve(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> AppResult<Response> {
    let bucket = Bucket::parse(&bucket).ok_or(AppError::NotFound)?;
    if !is_safe_key(&key) {
        return Err(AppError::NotFound);
    }

    let data = match state.store.read(bucket, &key).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let mime = mime_guess::from_path(&key).first_or_octet_stream();
    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        data,
    )
        .into_response())
}
