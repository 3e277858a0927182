use rusqlite::params;
use serde::Deserialize;

use super::{delete_owned, fetch_owned, list_by, required, Removal};
use crate::db::{self, models::Note};
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::state::DbPool;

#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl NotePatch {
    pub fn validate(self) -> AppResult<Self> {
        if self.title.is_none() && self.body.is_none() {
            return Err(AppError::validation("Nothing to update"));
        }
        let title = match self.title {
            Some(title) => Some(required(&title, "Please enter a title")?),
            None => None,
        };
        let body = match self.body {
            Some(body) if body.trim().is_empty() => {
                return Err(AppError::validation("Please enter some content"))
            }
            other => other,
        };
        Ok(Self { title, body })
    }
}

/// Most recently edited first.
pub fn list(pool: &DbPool, owner: &str) -> AppResult<Vec<Note>> {
    let conn = pool.get()?;
    list_by(&conn, "user_id", &owner, "updated_at")
}

pub fn create(pool: &DbPool, ctx: &AccountContext, input: NewNote) -> AppResult<Note> {
    let title = required(&input.title, "Please enter a title")?;
    if input.body.trim().is_empty() {
        return Err(AppError::validation("Please enter some content"));
    }

    let now = db::now();
    let note = Note {
        id: db::new_id(),
        user_id: ctx.id.clone(),
        title,
        // Markdown keeps its leading and trailing whitespace.
        body: input.body,
        created_at: now,
        updated_at: now,
    };

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO notes (id, user_id, title, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            note.id,
            note.user_id,
            note.title,
            note.body,
            db::format_time(&note.created_at),
            db::format_time(&note.updated_at)
        ],
    )?;

    tracing::info!(note = %note.id, owner = %ctx.id, "Note created");
    Ok(note)
}

pub fn update(pool: &DbPool, ctx: &AccountContext, id: &str, patch: NotePatch) -> AppResult<Note> {
    let patch = patch.validate()?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut note: Note = fetch_owned(&tx, ctx, id)?;
    if let Some(title) = patch.title {
        note.title = title;
    }
    if let Some(body) = patch.body {
        note.body = body;
    }
    note.updated_at = db::advance(&note.updated_at);

    tx.execute(
        "UPDATE notes SET title = ?1, body = ?2, updated_at = ?3 WHERE id = ?4 AND user_id = ?5",
        params![
            note.title,
            note.body,
            db::format_time(&note.updated_at),
            note.id,
            ctx.id
        ],
    )?;
    tx.commit()?;

    tracing::info!(note = %note.id, owner = %ctx.id, "Note updated");
    Ok(note)
}

pub fn delete(pool: &DbPool, ctx: &AccountContext, id: &str) -> AppResult<Removal> {
    let conn = pool.get()?;
    let note: Note = delete_owned(&conn, ctx, id)?;
    tracing::info!(note = %note.id, owner = %ctx.id, "Note deleted");
    Ok(Removal::clean(note.id))
}
