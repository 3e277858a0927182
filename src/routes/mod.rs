pub mod admin;
pub mod auth;
pub mod creatures;
pub mod food;
pub mod health;
pub mod images;
pub mod notes;
pub mod profiles;
pub mod storage;
pub mod tasks;

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::services::Upload;
use crate::state::AppState;

/// The full HTTP surface, with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(tasks::router())
        .merge(images::router())
        .merge(food::router())
        .merge(creatures::router())
        .merge(notes::router())
        .merge(profiles::router())
        .merge(admin::router())
        .merge(storage::router())
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Read a multipart form holding one `file` part plus plain text fields.
pub(crate) async fn read_upload(
    mut multipart: Multipart,
) -> AppResult<(Upload, HashMap<String, String>)> {
    let mut upload = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            upload = Some(Upload {
                file_name,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            fields.insert(name, value);
        }
    }

    let upload = upload.ok_or_else(|| AppError::validation("Please select an image file"))?;
    Ok((upload, fields))
}
