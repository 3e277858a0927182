use rusqlite::params;
use serde::Deserialize;

use super::{delete_owned, fetch_owned, list_by, remove_stored, required, store_upload};
use super::{Removal, Upload};
use crate::db::{self, models::Image};
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::state::DbPool;
use crate::storage::{Bucket, ObjectStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagePatch {
    pub name: Option<String>,
}

impl ImagePatch {
    pub fn validate(self) -> AppResult<Self> {
        match self.name {
            None => Err(AppError::validation("Nothing to update")),
            Some(name) => Ok(Self {
                name: Some(required(&name, "Name cannot be empty")?),
            }),
        }
    }
}

pub fn list(pool: &DbPool, owner: &str) -> AppResult<Vec<Image>> {
    let conn = pool.get()?;
    list_by(&conn, "user_id", &owner, "created_at")
}

/// Store the file in the `photos` bucket and record it, named after the
/// uploaded file.
pub async fn upload(
    pool: &DbPool,
    store: &dyn ObjectStore,
    ctx: &AccountContext,
    file: Upload,
) -> AppResult<Image> {
    file.validate()?;
    let name = required(&file.file_name, "File name is required")?;
    let url = store_upload(store, Bucket::Photos, &ctx.id, &file).await?;

    let now = db::now();
    let image = Image {
        id: db::new_id(),
        user_id: ctx.id.clone(),
        name,
        url,
        size: file.data.len() as u64,
        created_at: now,
        updated_at: now,
    };

    let inserted = pool.get().map_err(AppError::from).and_then(|conn| {
        conn.execute(
            "INSERT INTO images (id, user_id, name, url, size, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                image.id,
                image.user_id,
                image.name,
                image.url,
                image.size as i64,
                db::format_time(&image.created_at),
                db::format_time(&image.updated_at)
            ],
        )?;
        Ok(())
    });
    if let Err(e) = inserted {
        // The row never landed; do not leave its file behind.
        remove_stored(store, Bucket::Photos, &image.url).await;
        return Err(e);
    }

    tracing::info!(image = %image.id, owner = %ctx.id, size = image.size, "Image uploaded");
    Ok(image)
}

pub fn update(
    pool: &DbPool,
    ctx: &AccountContext,
    id: &str,
    patch: ImagePatch,
) -> AppResult<Image> {
    let patch = patch.validate()?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut image: Image = fetch_owned(&tx, ctx, id)?;
    if let Some(name) = patch.name {
        image.name = name;
    }
    image.updated_at = db::advance(&image.updated_at);

    tx.execute(
        "UPDATE images SET name = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        params![
            image.name,
            db::format_time(&image.updated_at),
            image.id,
            ctx.id
        ],
    )?;
    tx.commit()?;

    tracing::info!(image = %image.id, owner = %ctx.id, "Image renamed");
    Ok(image)
}

/// Delete the row, then its stored file. A file that cannot be removed is
/// reported on the returned `Removal`.
pub async fn delete(
    pool: &DbPool,
    store: &dyn ObjectStore,
    ctx: &AccountContext,
    id: &str,
) -> AppResult<Removal> {
    let image: Image = {
        let conn = pool.get()?;
        delete_owned(&conn, ctx, id)?
    };
    let warning = remove_stored(store, Bucket::Photos, &image.url).await;

    tracing::info!(image = %image.id, owner = %ctx.id, "Image deleted");
    Ok(Removal {
        id: image.id,
        warning,
    })
}
