//! Food posts (a stored photo with a name) and their rated comments.

use rusqlite::params;
use serde::Deserialize;

use super::{delete_owned, fetch_owned, find, list_by, rating, remove_stored, required};
use super::{store_upload, Removal, Upload};
use crate::db::{self, models::FoodComment, models::FoodPost};
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::state::DbPool;
use crate::storage::{Bucket, ObjectStore};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoodPostPatch {
    pub name: Option<String>,
}

impl FoodPostPatch {
    pub fn validate(self) -> AppResult<Self> {
        match self.name {
            None => Err(AppError::validation("Nothing to update")),
            Some(name) => Ok(Self {
                name: Some(required(&name, "Name cannot be empty")?),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub rating: i64,
    pub body: String,
}

impl NewComment {
    pub(crate) fn validate(&self) -> AppResult<(db::models::Rating, String)> {
        Ok((
            rating(self.rating)?,
            required(&self.body, "Please enter a comment")?,
        ))
    }
}

/// Partial update for either kind of comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPatch {
    pub rating: Option<i64>,
    pub body: Option<String>,
}

impl CommentPatch {
    pub fn validate(self) -> AppResult<Self> {
        if self.rating.is_none() && self.body.is_none() {
            return Err(AppError::validation("Nothing to update"));
        }
        if let Some(value) = self.rating {
            rating(value)?;
        }
        let body = match self.body {
            Some(body) => Some(required(&body, "Comment cannot be empty")?),
            None => None,
        };
        Ok(Self { body, ..self })
    }
}

pub fn list_posts(pool: &DbPool, owner: &str) -> AppResult<Vec<FoodPost>> {
    let conn = pool.get()?;
    list_by(&conn, "user_id", &owner, "created_at")
}

pub fn get_post(pool: &DbPool, id: &str) -> AppResult<FoodPost> {
    let conn = pool.get()?;
    find(&conn, id)?.ok_or(AppError::NotFound)
}

pub async fn upload_post(
    pool: &DbPool,
    store: &dyn ObjectStore,
    ctx: &AccountContext,
    file: Upload,
    name: &str,
) -> AppResult<FoodPost> {
    let name = required(name, "Please enter a name for the food")?;
    file.validate()?;
    let url = store_upload(store, Bucket::FoodPhotos, &ctx.id, &file).await?;

    let now = db::now();
    let post = FoodPost {
        id: db::new_id(),
        user_id: ctx.id.clone(),
        name,
        url,
        created_at: now,
        updated_at: now,
    };

    let inserted = pool.get().map_err(AppError::from).and_then(|conn| {
        conn.execute(
            "INSERT INTO food_posts (id, user_id, name, url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.id,
                post.user_id,
                post.name,
                post.url,
                db::format_time(&post.created_at),
                db::format_time(&post.updated_at)
            ],
        )?;
        Ok(())
    });
    if let Err(e) = inserted {
        remove_stored(store, Bucket::FoodPhotos, &post.url).await;
        return Err(e);
    }

    tracing::info!(post = %post.id, owner = %ctx.id, "Food post uploaded");
    Ok(post)
}

pub fn update_post(
    pool: &DbPool,
    ctx: &AccountContext,
    id: &str,
    patch: FoodPostPatch,
) -> AppResult<FoodPost> {
    let patch = patch.validate()?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut post: FoodPost = fetch_owned(&tx, ctx, id)?;
    if let Some(name) = patch.name {
        post.name = name;
    }
    post.updated_at = db::advance(&post.updated_at);

    tx.execute(
        "UPDATE food_posts SET name = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
        params![
            post.name,
            db::format_time(&post.updated_at),
            post.id,
            ctx.id
        ],
    )?;
    tx.commit()?;

    tracing::info!(post = %post.id, owner = %ctx.id, "Food post renamed");
    Ok(post)
}

/// Delete a post with its comments, then its stored photo.
pub async fn delete_post(
    pool: &DbPool,
    store: &dyn ObjectStore,
    ctx: &AccountContext,
    id: &str,
) -> AppResult<Removal> {
    let (post, comments) = {
        let mut conn = pool.get()?;
        let tx = conn.transaction()?;
        let post: FoodPost = fetch_owned(&tx, ctx, id)?;
        let comments = tx.execute(
            "DELETE FROM food_comments WHERE food_post_id = ?1",
            params![post.id],
        )?;
        let post: FoodPost = delete_owned(&tx, ctx, &post.id)?;
        tx.commit()?;
        (post, comments)
    };
    let warning = remove_stored(store, Bucket::FoodPhotos, &post.url).await;

    tracing::info!(post = %post.id, owner = %ctx.id, comments, "Food post deleted");
    Ok(Removal {
        id: post.id,
        warning,
    })
}

pub fn list_comments(pool: &DbPool, post_id: &str) -> AppResult<Vec<FoodComment>> {
    let conn = pool.get()?;
    list_by(&conn, "food_post_id", &post_id, "created_at")
}

pub fn get_comment(pool: &DbPool, id: &str) -> AppResult<FoodComment> {
    let conn = pool.get()?;
    find(&conn, id)?.ok_or(AppError::NotFound)
}

/// Any signed-in account may comment on any post.
pub fn create_comment(
    pool: &DbPool,
    ctx: &AccountContext,
    post_id: &str,
    input: NewComment,
) -> AppResult<FoodComment> {
    let (rating, body) = input.validate()?;
    let conn = pool.get()?;
    find::<FoodPost>(&conn, post_id)?.ok_or(AppError::NotFound)?;

    let now = db::now();
    let comment = FoodComment {
        id: db::new_id(),
        food_post_id: post_id.to_string(),
        user_id: ctx.id.clone(),
        rating,
        body,
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO food_comments (id, food_post_id, user_id, rating, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            comment.id,
            comment.food_post_id,
            comment.user_id,
            comment.rating,
            comment.body,
            db::format_time(&comment.created_at),
            db::format_time(&comment.updated_at)
        ],
    )?;

    tracing::info!(comment = %comment.id, post = %post_id, owner = %ctx.id, "Food comment created");
    Ok(comment)
}

pub fn update_comment(
    pool: &DbPool,
    ctx: &AccountContext,
    id: &str,
    patch: CommentPatch,
) -> AppResult<FoodComment> {
    let patch = patch.validate()?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut comment: FoodComment = fetch_owned(&tx, ctx, id)?;
    if let Some(value) = patch.rating {
        comment.rating = rating(value)?;
    }
    if let Some(body) = patch.body {
        comment.body = body;
    }
    comment.updated_at = db::advance(&comment.updated_at);

    tx.execute(
        "UPDATE food_comments SET rating = ?1, body = ?2, updated_at = ?3
         WHERE id = ?4 AND user_id = ?5",
        params![
            comment.rating,
            comment.body,
            db::format_time(&comment.updated_at),
            comment.id,
            ctx.id
        ],
    )?;
    tx.commit()?;

    tracing::info!(comment = %comment.id, owner = %ctx.id, "Food comment updated");
    Ok(comment)
}

/// Returns the deleted comment so callers know which post it was under.
pub fn delete_comment(pool: &DbPool, ctx: &AccountContext, id: &str) -> AppResult<FoodComment> {
    let conn = pool.get()?;
    let comment: FoodComment = delete_owned(&conn, ctx, id)?;
    tracing::info!(comment = %comment.id, owner = %ctx.id, "Food comment deleted");
    Ok(comment)
}
