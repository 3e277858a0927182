use rusqlite::params;
use serde::Deserialize;

use super::{delete_owned, fetch_owned, list_by, required, Removal};
use crate::db::{self, models::Priority, models::Task};
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::state::DbPool;

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn validate(self) -> AppResult<Self> {
        if self.title.is_none() && self.completed.is_none() && self.priority.is_none() {
            return Err(AppError::validation("Nothing to update"));
        }
        let title = match self.title {
            Some(title) => Some(required(&title, "Title cannot be empty")?),
            None => None,
        };
        Ok(Self { title, ..self })
    }
}

pub fn list(pool: &DbPool, owner: &str) -> AppResult<Vec<Task>> {
    let conn = pool.get()?;
    list_by(&conn, "user_id", &owner, "created_at")
}

pub fn create(pool: &DbPool, ctx: &AccountContext, input: NewTask) -> AppResult<Task> {
    let title = required(&input.title, "Please enter a todo title")?;
    let now = db::now();
    let task = Task {
        id: db::new_id(),
        user_id: ctx.id.clone(),
        title,
        completed: false,
        priority: input.priority,
        created_at: now,
        updated_at: now,
    };

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO tasks (id, user_id, title, completed, priority, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            task.id,
            task.user_id,
            task.title,
            task.completed,
            task.priority,
            db::format_time(&task.created_at),
            db::format_time(&task.updated_at)
        ],
    )?;

    tracing::info!(task = %task.id, owner = %ctx.id, "Task created");
    Ok(task)
}

pub fn update(pool: &DbPool, ctx: &AccountContext, id: &str, patch: TaskPatch) -> AppResult<Task> {
    let patch = patch.validate()?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut task: Task = fetch_owned(&tx, ctx, id)?;
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(completed) = patch.completed {
        task.completed = completed;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    task.updated_at = db::advance(&task.updated_at);

    tx.execute(
        "UPDATE tasks SET title = ?1, completed = ?2, priority = ?3, updated_at = ?4
         WHERE id = ?5 AND user_id = ?6",
        params![
            task.title,
            task.completed,
            task.priority,
            db::format_time(&task.updated_at),
            task.id,
            ctx.id
        ],
    )?;
    tx.commit()?;

    tracing::info!(task = %task.id, owner = %ctx.id, "Task updated");
    Ok(task)
}

pub fn delete(pool: &DbPool, ctx: &AccountContext, id: &str) -> AppResult<Removal> {
    let conn = pool.get()?;
    let task: Task = delete_owned(&conn, ctx, id)?;
    tracing::info!(task = %task.id, owner = %ctx.id, "Task deleted");
    Ok(Removal::clean(task.id))
}
