use std::sync::Arc;

use super::{db_loader, settle, MutationCallbacks};
use crate::cache::{Invalidation, ViewKey};
use crate::db::models::Note;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::services::notes::{self, NewNote, NotePatch};
use crate::services::Removal;
use crate::state::AppState;

pub struct NoteHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
}

impl<'a> NoteHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext) -> Self {
        Self { state, ctx }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::Notes(self.ctx.id.clone())
    }

    fn invalidation(&self) -> Invalidation {
        Invalidation::Notes {
            owner: self.ctx.id.clone(),
        }
    }

    pub async fn notes(&self) -> AppResult<Arc<Vec<Note>>> {
        let owner = self.ctx.id.clone();
        let load = db_loader(&self.state.db, move |pool| notes::list(pool, &owner));
        self.state.views.get(self.key(), load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }

    pub async fn create(&self, input: NewNote, callbacks: MutationCallbacks<Note>) -> AppResult<Note> {
        let result = notes::create(&self.state.db, self.ctx, input);
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: NotePatch,
        callbacks: MutationCallbacks<Note>,
    ) -> AppResult<Note> {
        let result = notes::update(&self.state.db, self.ctx, id, patch);
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }

    pub async fn delete(&self, id: &str, callbacks: MutationCallbacks<Removal>) -> AppResult<Removal> {
        let result = notes::delete(&self.state.db, self.ctx, id);
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }
}
