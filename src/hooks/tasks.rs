use std::sync::Arc;

use super::{db_loader, settle, MutationCallbacks};
use crate::cache::{Invalidation, ViewKey};
use crate::db::models::Task;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::services::tasks::{self, NewTask, TaskPatch};
use crate::services::Removal;
use crate::state::AppState;

/// The caller's todo list.
pub struct TaskHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
}

impl<'a> TaskHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext) -> Self {
        Self { state, ctx }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::Tasks(self.ctx.id.clone())
    }

    fn invalidation(&self) -> Invalidation {
        Invalidation::Tasks {
            owner: self.ctx.id.clone(),
        }
    }

    pub async fn tasks(&self) -> AppResult<Arc<Vec<Task>>> {
        let owner = self.ctx.id.clone();
        let load = db_loader(&self.state.db, move |pool| tasks::list(pool, &owner));
        self.state.views.get(self.key(), load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }

    pub async fn create(&self, input: NewTask, callbacks: MutationCallbacks<Task>) -> AppResult<Task> {
        let result = tasks::create(&self.state.db, self.ctx, input);
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: TaskPatch,
        callbacks: MutationCallbacks<Task>,
    ) -> AppResult<Task> {
        let result = tasks::update(&self.state.db, self.ctx, id, patch);
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }

    pub async fn delete(&self, id: &str, callbacks: MutationCallbacks<Removal>) -> AppResult<Removal> {
        let result = tasks::delete(&self.state.db, self.ctx, id);
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }
}
