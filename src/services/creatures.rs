//! Rated comments on catalog creatures. The creature itself lives in the
//! external catalog; only its id and name are kept here.

use rusqlite::params;
use serde::Deserialize;

use super::food::{CommentPatch, NewComment};
use super::{delete_owned, fetch_owned, find, list_by, rating, required};
use crate::db::{self, models::CreatureComment};
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::state::DbPool;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCreatureComment {
    pub creature_id: i64,
    pub creature_name: String,
    #[serde(flatten)]
    pub comment: NewComment,
}

pub fn list_comments(pool: &DbPool, creature_id: i64) -> AppResult<Vec<CreatureComment>> {
    let conn = pool.get()?;
    list_by(&conn, "creature_id", &creature_id, "created_at")
}

/// Every creature comment written by `owner`.
pub fn list_for_account(pool: &DbPool, owner: &str) -> AppResult<Vec<CreatureComment>> {
    let conn = pool.get()?;
    list_by(&conn, "user_id", &owner, "created_at")
}

pub fn get_comment(pool: &DbPool, id: &str) -> AppResult<CreatureComment> {
    let conn = pool.get()?;
    find(&conn, id)?.ok_or(AppError::NotFound)
}

pub fn create_comment(
    pool: &DbPool,
    ctx: &AccountContext,
    input: NewCreatureComment,
) -> AppResult<CreatureComment> {
    if input.creature_id <= 0 {
        return Err(AppError::validation("Unknown creature"));
    }
    let creature_name = required(&input.creature_name, "Creature name is required")?;
    let (rating, body) = input.comment.validate()?;

    let now = db::now();
    let comment = CreatureComment {
        id: db::new_id(),
        creature_id: input.creature_id,
        creature_name,
        user_id: ctx.id.clone(),
        rating,
        body,
        created_at: now,
        updated_at: now,
    };

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO creature_comments
            (id, creature_id, creature_name, user_id, rating, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            comment.id,
            comment.creature_id,
            comment.creature_name,
            comment.user_id,
            comment.rating,
            comment.body,
            db::format_time(&comment.created_at),
            db::format_time(&comment.updated_at)
        ],
    )?;

    tracing::info!(
        comment = %comment.id,
        creature = comment.creature_id,
        owner = %ctx.id,
        "Creature comment created"
    );
    Ok(comment)
}

pub fn update_comment(
    pool: &DbPool,
    ctx: &AccountContext,
    id: &str,
    patch: CommentPatch,
) -> AppResult<CreatureComment> {
    let patch = patch.validate()?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut comment: CreatureComment = fetch_owned(&tx, ctx, id)?;
    if let Some(value) = patch.rating {
        comment.rating = rating(value)?;
    }
    if let Some(body) = patch.body {
        comment.body = body;
    }
    comment.updated_at = db::advance(&comment.updated_at);

    tx.execute(
        "UPDATE creature_comments SET rating = ?1, body = ?2, updated_at = ?3
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

    tracing::info!(comment = %comment.id, owner = %ctx.id, "Creature comment updated");
    Ok(comment)
}

/// Returns the deleted comment so callers know which creature it was about.
pub fn delete_comment(
    pool: &DbPool,
    ctx: &AccountContext,
    id: &str,
) -> AppResult<CreatureComment> {
    let conn = pool.get()?;
    let comment: CreatureComment = delete_owned(&conn, ctx, id)?;
    tracing::info!(comment = %comment.id, owner = %ctx.id, "Creature comment deleted");
    Ok(comment)
}
