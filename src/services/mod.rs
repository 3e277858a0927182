//! One module per entity. Each call runs against the pool (and the object
//! store for file-backed entities) scoped to the calling account.

pub mod accounts;
pub mod creatures;
pub mod food;
pub mod images;
pub mod notes;
pub mod profiles;
pub mod tasks;

use bytes::Bytes;
use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::models::{Rating, Record};
use crate::error::{AppError, AppResult, PartialCleanupWarning};
use crate::extractors::AccountContext;
use crate::storage::{self, Bucket, ObjectStore};

/// A file received from the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub fn validate(&self) -> AppResult<()> {
        if self.data.is_empty() {
            return Err(AppError::validation("Please select an image file"));
        }
        let is_image = self
            .content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(AppError::validation("Please select an image file"));
        }
        Ok(())
    }
}

/// Result of a delete. Carries a warning when a stored file outlived its row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Removal {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PartialCleanupWarning>,
}

impl Removal {
    pub fn clean(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            warning: None,
        }
    }
}

/// Trimmed, non-empty text or a validation error with `message`.
pub(crate) fn required(value: &str, message: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::validation(message))
    } else {
        Ok(value.to_string())
    }
}

pub(crate) fn rating(value: i64) -> AppResult<Rating> {
    Rating::new(value).ok_or_else(|| {
        AppError::validation(format!(
            "Rating must be between {} and {}",
            Rating::MIN,
            Rating::MAX
        ))
    })
}

pub(crate) fn find<T: Record>(conn: &Connection, id: &str) -> AppResult<Option<T>> {
    let record = conn
        .query_row(
            &format!("SELECT {} FROM {} WHERE id = ?1", T::COLUMNS, T::TABLE),
            params![id],
            T::from_row,
        )
        .optional()?;
    Ok(record)
}

/// Fetch a record the caller is about to mutate.
/// `NotFound` when it does not exist, `Forbidden` when someone else owns it.
pub(crate) fn fetch_owned<T: Record>(
    conn: &Connection,
    ctx: &AccountContext,
    id: &str,
) -> AppResult<T> {
    let record: T = find(conn, id)?.ok_or(AppError::NotFound)?;
    if !ctx.owns(record.owner_id()) {
        return Err(AppError::Forbidden);
    }
    Ok(record)
}

/// All records where `column = value`, newest first by `order_column`.
pub(crate) fn list_by<T: Record>(
    conn: &Connection,
    column: &str,
    value: &dyn ToSql,
    order_column: &str,
) -> AppResult<Vec<T>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE {} = ?1 ORDER BY {} DESC, id DESC",
        T::COLUMNS,
        T::TABLE,
        column,
        order_column
    ))?;
    let rows = stmt.query_map([value], T::from_row)?;
    let records = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Delete a record owned by the caller and return what was removed.
pub(crate) fn delete_owned<T: Record>(
    conn: &Connection,
    ctx: &AccountContext,
    id: &str,
) -> AppResult<T> {
    let record: T = fetch_owned(conn, ctx, id)?;
    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1 AND user_id = ?2", T::TABLE),
        params![id, ctx.id],
    )?;
    Ok(record)
}

/// Store an upload under `{owner}/{millis}.{ext}` and return its public URL.
/// A taken key moves the timestamp forward until a free one is found.
pub(crate) async fn store_upload(
    store: &dyn ObjectStore,
    bucket: Bucket,
    owner: &str,
    upload: &Upload,
) -> AppResult<String> {
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let key = storage::object_key(owner, millis, &upload.file_name);
        match store.upload(bucket, &key, upload.data.clone()).await {
            Ok(key) => return Ok(store.public_url(bucket, &key)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => millis += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Best-effort removal of the file behind a persisted URL.
pub(crate) async fn remove_stored(
    store: &dyn ObjectStore,
    bucket: Bucket,
    url: &str,
) -> Option<PartialCleanupWarning> {
    let warning = match storage::key_from_url(bucket, url) {
        None => PartialCleanupWarning {
            bucket: bucket.to_string(),
            key: url.to_string(),
            reason: format!("URL does not point into bucket {}", bucket),
        },
        Some(key) => match store.remove(bucket, std::slice::from_ref(&key)).await {
            Ok(()) => return None,
            Err(e) => PartialCleanupWarning {
                bucket: bucket.to_string(),
                key,
                reason: e.to_string(),
            },
        },
    };
    warning.log();
    Some(warning)
}
